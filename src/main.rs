use bank_etl::utils::error::EtlError;
use bank_etl::utils::{logger, validation::Validate};
use bank_etl::{BankConfig, BankPipeline, CliArgs, EtlEngine, LocalStorage, SinkWriter};
use clap::Parser;

fn fail(stage: &str, e: &EtlError) -> ! {
    tracing::error!(
        "❌ {}: {} (Category: {:?}, Severity: {:?})",
        stage,
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e.user_friendly_message());
    std::process::exit(e.exit_code());
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    // 初始化日誌
    if args.json_logs {
        logger::init_json_logger(args.verbose);
    } else {
        logger::init_cli_logger(args.verbose);
    }

    tracing::info!("Starting bank-etl");
    tracing::debug!("CLI args: {:?}", args);

    let mut config = match BankConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => fail("Cannot load configuration", &e),
    };
    if let Some(sink) = &args.sink {
        tracing::info!("Sink type overridden from the command line: {}", sink);
        config.sink_type = sink.clone();
    }
    if args.verbose {
        tracing::debug!("Config: {:?}", config);
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        fail("Configuration validation failed", &e);
    }

    let sink = match SinkWriter::from_config(&config) {
        Ok(sink) => sink,
        Err(e) => fail("Cannot set up the output", &e),
    };
    tracing::info!("Writing to {:?} sink", sink.kind());

    if args.monitor {
        tracing::info!("🔍 System monitoring enabled");
    }

    // 創建存儲和管道
    let storage = LocalStorage::new(config.base_path());
    let pipeline = BankPipeline::new(storage, config, sink);

    if args.dry_run {
        let plan = pipeline.plan().await;
        for entry in &plan {
            tracing::info!(
                "{} / {}: {} ({})",
                entry.account,
                entry.character,
                entry.dump_path.display(),
                if entry.present { "found" } else { "missing" }
            );
        }
        println!(
            "Dry run: {} of {} dump files present, nothing written.",
            plan.iter().filter(|entry| entry.present).count(),
            plan.len()
        );
        return Ok(());
    }

    let engine = EtlEngine::new_with_monitoring(pipeline, args.monitor);

    match engine.run().await {
        Ok(destination) => {
            tracing::info!("📁 Output written to: {}", destination);
            tracing::info!("Extraction and processing completed.");
            println!("✅ Extraction and processing completed.");
            println!("📁 Output written to: {}", destination);
            Ok(())
        }
        Err(e) => fail("Extraction failed", &e),
    }
}
