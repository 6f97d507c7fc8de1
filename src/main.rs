use clap::Parser;

use engagement_core::cli::{Cli, Commands};
use engagement_core::config::{get_config, init_config_from};
use engagement_core::runtime::modes;
use engagement_core::system::logging::init_logging;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_config_from(cli.config.as_deref());

    let command = cli.command.unwrap_or(Commands::Serve);

    // 生成配置不需要日志
    if matches!(command, Commands::GenerateConfig { .. }) {
        return modes::run_command(command).await;
    }

    let config = get_config();
    let _guard = init_logging(&config.logging)?;

    modes::run_command(command).await
}
