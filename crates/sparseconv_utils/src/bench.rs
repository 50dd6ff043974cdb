use std::{sync::Arc, time::Instant};

use sparseconv_core::{
    conv::{fused_sparse_conv_timed, ConvTimings},
    cpu::CpuThread,
    device::{Device, OperationError},
    shape::Shape,
    tensor::{DenseMatrix, Filters, IndicePairs},
};
use structopt::StructOpt;

#[derive(StructOpt)]
pub struct BenchOptions {
    #[structopt(long, default_value = "4096")]
    sites: usize,
    #[structopt(long, default_value = "64")]
    in_planes: usize,
    #[structopt(long, default_value = "64")]
    out_planes: usize,
    #[structopt(long, default_value = "27")]
    kernel_volume: usize,
    #[structopt(long, default_value = "100")]
    iters: usize,
    #[structopt(long)]
    submanifold: bool,
}

impl BenchOptions {
    pub fn run(&self) -> anyhow::Result<()> {
        let device = Arc::new(CpuThread);

        let mut features = DenseMatrix::zeroed(device.clone(), Shape::new(self.in_planes, self.sites))
            .map_err(OperationError::from)?;
        features.seed_random(0.0, 1.0, true).map_err(OperationError::from)?;

        let mut filters = Filters::zeroed(device.clone(), self.kernel_volume, self.in_planes, self.out_planes)
            .map_err(OperationError::from)?;
        filters.seed_random(0.0, 0.1, true).map_err(OperationError::from)?;

        let mut bias =
            DenseMatrix::zeroed(device.clone(), Shape::new(self.out_planes, 1)).map_err(OperationError::from)?;
        bias.seed_random(0.0, 0.1, true).map_err(OperationError::from)?;

        let pairs = self.build_pairs(device.clone())?;

        println!("# [Running Benchmark]");
        let time = Instant::now();

        let mut timings = ConvTimings::default();
        let mut checksum = 0.0;
        for _ in 0..self.iters {
            let output = fused_sparse_conv_timed(
                &features,
                &filters,
                &bias,
                &pairs,
                self.sites,
                false,
                self.submanifold,
                &mut timings,
            )?;

            let mut buf = vec![0.0; output.size()];
            output.write_to_slice(&mut buf).map_err(OperationError::from)?;
            checksum += f64::from(buf[0]);
        }

        device.synchronise().map_err(OperationError::from)?;

        println!("> Took {:.2} seconds.", time.elapsed().as_secs_f32());
        println!("> Checksum {checksum:.6}");
        timings.report();

        Ok(())
    }

    /// Synthetic neighbour table: every offset pairs site `j` with site
    /// `(j + i) % sites`, and in submanifold mode the center offset keeps an
    /// identity mapping with strictly the most pairs.
    fn build_pairs(&self, device: Arc<CpuThread>) -> anyhow::Result<IndicePairs<CpuThread>> {
        let center = self.kernel_volume / 2;
        let mut counts = vec![0i32; self.kernel_volume];
        let mut flat = vec![0i32; 2 * self.kernel_volume * self.sites];

        for i in 0..self.kernel_volume {
            let count =
                if self.submanifold && i != center { self.sites.saturating_sub(1) } else { self.sites };
            counts[i] = count as i32;

            let base = 2 * i * self.sites;
            for j in 0..count {
                let dst = if i == center { j } else { (j + i) % self.sites };
                flat[base + j] = j as i32;
                flat[base + self.sites + j] = dst as i32;
            }
        }

        let mut pairs =
            IndicePairs::zeroed(device, self.kernel_volume, self.sites).map_err(OperationError::from)?;

        unsafe {
            pairs.load_from_slice(&counts, &flat).map_err(OperationError::from)?;
        }

        Ok(pairs)
    }
}
