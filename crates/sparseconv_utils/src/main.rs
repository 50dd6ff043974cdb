mod bench;
mod check;

use structopt::StructOpt;

#[derive(StructOpt)]
pub enum Options {
    Bench(bench::BenchOptions),
    Check(check::CheckOptions),
}

fn main() -> anyhow::Result<()> {
    match Options::from_args() {
        Options::Bench(options) => options.run(),
        Options::Check(options) => options.run(),
    }
}
