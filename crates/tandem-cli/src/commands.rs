use anyhow::Context;
use bytes::Bytes;
use colored::Colorize;
use tandem_crypto::ContentHasher;
use tandem_server::{Gateway, GatewayContext, ServerConfig};

use crate::cli::*;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Serve(args) => cmd_serve(args).await,
        Command::Demo(args) => cmd_demo(args).await,
        Command::Cid(args) => cmd_cid(args),
    }
}

fn load_config(args: &ServeArgs) -> anyhow::Result<ServerConfig> {
    let config = match &args.config {
        Some(path) => ServerConfig::from_toml_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ServerConfig::default(),
    };
    let mut config = config.with_env()?;
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    tracing::debug!(?config, "configuration loaded");
    Ok(config)
}

async fn cmd_serve(args: ServeArgs) -> anyhow::Result<()> {
    let config = load_config(&args)?;
    println!(
        "{} Tandem gateway on {}",
        "✓".green().bold(),
        format!("http://{}", config.bind_addr).bold()
    );
    println!("  GET /api/createnodes, then GET /api/mapnodes to link the nodes");
    Gateway::new(config).serve().await?;
    println!("{} Gateway stopped.", "✓".green());
    Ok(())
}

async fn cmd_demo(args: DemoArgs) -> anyhow::Result<()> {
    let ctx = GatewayContext::new(&ServerConfig::default());

    let [(first, _), (second, _)] = ctx.start_nodes()?;
    println!("{} node1 {}", "started".green(), first.to_string().cyan());
    println!("{} node2 {}", "started".green(), second.to_string().cyan());

    ctx.link_nodes().await?;
    println!("{} node1 → node2", "linked".green());

    let cid = ctx.writer_fs().add_bytes(Bytes::from(args.text.clone()))?;
    println!("{} {:?} as {}", "published".green(), args.text, cid.to_string().yellow());

    let fetched = ctx.reader_fs().cat(&cid).read_to_end().await?;
    println!(
        "{} via node2: {:?}",
        "resolved".green(),
        String::from_utf8_lossy(&fetched)
    );

    let file = ctx.writer_fs().add_file("demo.txt", fetched)?;
    let directory = ctx.add_upload("demo.txt", &file).await?;
    println!("{} demo.txt into {}", "linked".green(), directory.to_string().yellow());
    for entry in ctx.reader_fs().ls(&directory).await? {
        println!("  {}  {}", entry.name.bold(), entry.cid.to_string().dimmed());
    }

    ctx.shutdown().await;
    println!("{} Demo complete.", "✓".green().bold());
    Ok(())
}

fn cmd_cid(args: CidArgs) -> anyhow::Result<()> {
    println!("{}", ContentHasher::RAW.hash(args.text.as_bytes()));
    Ok(())
}
