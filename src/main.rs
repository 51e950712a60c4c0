use anyhow::Result;
use rolling_restart::app;
use rolling_restart::cli;

#[tokio::main]
async fn main() -> Result<()> {
    let invocation = cli::parse()?;
    app::init_tracing(invocation.verbosity);
    let exit_code = app::run(invocation.command).await?;
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
    Ok(())
}
