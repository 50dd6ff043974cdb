use std::sync::Arc;

use sparseconv_core::{cpu::CpuThread, device::Device};
use structopt::StructOpt;

#[derive(StructOpt)]
pub struct CheckOptions {}

impl CheckOptions {
    pub fn run(&self) -> anyhow::Result<()> {
        Arc::new(CpuThread).sanity_check();
        Ok(())
    }
}
