//! Embedded assets: the static X11 configuration files compiled into the binary.
//!
//! At compile time, `include_dir!` embeds everything under `cli/assets/`:
//!   - `xorg-dummy.conf`   : dummy device/monitor/screen, passed to `Xorg -config`
//!   - `input-devices.conf`: virtual input classes, installed into `xorg.conf.d`

use anyhow::Result;
use include_dir::{Dir, include_dir};

use crate::application::ports::AssetSource;

static EMBEDDED_ASSETS: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/assets");

/// Return the raw bytes of a single embedded asset.
///
/// # Errors
///
/// Returns an error if no asset with the given `name` exists.
pub fn get_asset(name: &str) -> Result<&'static [u8]> {
    EMBEDDED_ASSETS
        .get_file(name)
        .map(|f| f.contents())
        .ok_or_else(|| anyhow::anyhow!("embedded asset not found: {name}"))
}

/// `AssetSource` backed by the compiled-in directory.
pub struct EmbeddedAssets;

impl AssetSource for EmbeddedAssets {
    fn get_asset(&self, name: &str) -> Result<&'static [u8]> {
        get_asset(name)
    }
}
