use clap::Parser;
use mdwiki::cli::{self, Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 解析命令行参数
    let cli = Cli::parse();

    // 初始化日志
    mdwiki::init(cli.verbose)?;

    let settings_path = cli::commands::settings_path(cli.settings)?;

    // 执行命令
    match cli.command {
        Commands::List(args) => cli::commands::list(args, &settings_path),
        Commands::Add(args) => cli::commands::add(args, &settings_path),
        Commands::Remove(args) => cli::commands::remove(args, &settings_path),
        Commands::Render(args) => cli::commands::render(args, &settings_path).await,
        Commands::Watch(args) => cli::commands::watch(args, &settings_path).await,
    }
}
