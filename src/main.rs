#[cfg(not(target_arch = "wasm32"))]
mod cli {
    use clap::{Parser, ValueEnum};
    use gallery_xr::config::{AssetSource, ViewConfig};

    #[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
    pub(super) enum ViewArg {
        /// Rotating, drifting NFT model
        Ar,
        /// Equirectangular panorama around the viewer
        Vr,
    }

    /// Opens one of the gallery's 3D views in a native window.
    #[derive(Parser, Debug)]
    #[command(name = "gallery", version)]
    pub(super) struct Args {
        /// Which view to mount.
        #[arg(value_enum)]
        pub view: ViewArg,

        /// Directory or http(s) URL the asset paths are resolved against.
        /// Overrides the GALLERY_ASSET_BASE environment variable.
        #[arg(long)]
        pub asset_base: Option<String>,

        /// Initial window width in pixels.
        #[arg(long, requires = "height")]
        pub width: Option<u32>,

        /// Initial window height in pixels.
        #[arg(long, requires = "width")]
        pub height: Option<u32>,
    }

    impl Args {
        pub(super) fn view_config(&self) -> anyhow::Result<ViewConfig> {
            let config = match self.view {
                ViewArg::Ar => ViewConfig::ar(),
                ViewArg::Vr => ViewConfig::vr(),
            };
            Ok(match &self.asset_base {
                Some(base) => config.with_source(AssetSource::parse(base)?),
                None => config,
            })
        }

        pub(super) fn window_size(&self) -> Option<(u32, u32)> {
            self.width.zip(self.height)
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> anyhow::Result<()> {
    use clap::Parser;

    let args = cli::Args::parse();
    gallery_xr::flow::run(args.view_config()?, args.window_size())
}

#[cfg(target_arch = "wasm32")]
fn main() {}
