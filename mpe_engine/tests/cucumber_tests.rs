mod cucumber;

use ::cucumber::{writer, World};
use log::*;
use tokio::runtime::Runtime;

use crate::cucumber::EngineWorld;

fn main() {
    let _ = env_logger::try_init();
    let sys = Runtime::new().expect("Could not start the tokio runtime");
    sys.block_on(EngineWorld::cucumber().with_writer(writer::Libtest::or_basic()).run("tests/features"));
    info!("🚀️ Tests complete");
}
