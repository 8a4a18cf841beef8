use trade_tape::{cli::run_cli, utils::init_tracing};

fn main() -> anyhow::Result<()> {
    init_tracing();
    run_cli()
}
