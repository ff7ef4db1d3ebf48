use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    rc::Rc,
};

use log::{debug, info};

use super::banner::{self, DecodedIcon};

/// Non-owning view of a cached icon. The cache keeps the icon alive until
/// it is cleared.
pub type IconHandle = Rc<DecodedIcon>;

/// Decoded cartridge icons keyed by the path they were requested with.
/// Entries are only added on a successful decode and only removed in bulk.
#[derive(Default)]
pub struct IconCache {
    icons: HashMap<PathBuf, IconHandle>,
}

impl IconCache {
    pub fn new() -> IconCache {
        IconCache::default()
    }

    /// Returns the icon for `path`, decoding it on first request.
    /// Any read or decode failure yields `None` so the caller can draw a
    /// placeholder.
    pub fn load_icon(&mut self, path: &Path) -> Option<IconHandle> {
        if let Some(icon) = self.icons.get(path) {
            return Some(Rc::clone(icon));
        }

        match banner::read_cartridge(path) {
            Ok((header, cart_banner)) => {
                debug!(
                    "decoded icon for {} ({} {}, banner v{})",
                    path.display(),
                    header.title_text(),
                    String::from_utf8_lossy(&header.code),
                    cart_banner.version
                );
                let icon = Rc::new(cart_banner.decode_icon());
                self.icons.insert(path.to_path_buf(), Rc::clone(&icon));
                Some(icon)
            }
            Err(err) => {
                debug!("no icon for {}: {err}", path.display());
                None
            }
        }
    }

    pub fn clear(&mut self) {
        if !self.icons.is_empty() {
            info!("dropping {} cached icons", self.icons.len());
        }
        self.icons.clear();
    }

    pub fn len(&self) -> usize {
        self.icons.len()
    }
}
