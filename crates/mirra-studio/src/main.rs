mod app;

use anyhow::Result;
use mirra_engine::device::GpuInit;
use mirra_engine::logging::{LoggingConfig, init_logging};
use mirra_engine::window::{Runtime, RuntimeConfig};
use winit::dpi::LogicalSize;

use app::SpheresApp;

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let config = RuntimeConfig {
        title: "Mirra Infinite Spheres".to_string(),
        initial_size: LogicalSize::new(800.0, 600.0),
        ..RuntimeConfig::default()
    };

    Runtime::run(config, GpuInit::with_msaa(4), SpheresApp::new())
}
