use clap::Parser;
use guild_fill::adapters::seed::{import_seed, SeedFile};
use guild_fill::config::cli::{AssignCommand, Command, PairCommand, ProfileArgs, ProviderCommand};
use guild_fill::domain::model::{
    ActivityId, AssignmentId, PairId, ProviderId, ProviderProfile, SignupId, UserId,
};
use guild_fill::utils::error::ErrorCategory;
use guild_fill::utils::{logger, validation::Validate};
use guild_fill::{
    AssignmentRequest, CliConfig, FillError, FillService, LocalStorage, MatchSession,
    MemoryStore, PointsRequest, SnapshotFile, SnapshotLock, TomlConfig,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    let mut config = match TomlConfig::from_file_or_default(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", cli.config, e);
            std::process::exit(1);
        }
    };
    if let Some(dir) = &cli.data_dir {
        config.store.data_dir = dir.clone();
    }

    // 初始化日誌
    if cli.json_logs || config.logging.json {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(cli.verbose || config.logging.verbose);
    }

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    let snapshot = SnapshotFile::new(
        LocalStorage::new(config.store.data_dir.clone()),
        config.store.snapshot_file.clone(),
    );

    // 其他 guild-fill 行程寫回之前不能讀快照
    let mut snapshot_lock = SnapshotLock::open(&config.store.data_dir, snapshot.file_name())?;
    tracing::debug!("Waiting for {}", snapshot_lock.path().display());
    let _held = snapshot_lock.acquire()?;

    let store = snapshot.load().await?;
    let service = FillService::new(store.clone(), config.engine_settings());

    match run(&service, &cli).await {
        Ok(output) => {
            snapshot.save(&store).await?;
            println!("{}", output);
        }
        Err(e) => {
            tracing::error!("❌ Command failed: {} (Category: {:?})", e, e.category());
            eprintln!("❌ {}", e.user_friendly_message());
            if !e.is_user_facing() {
                eprintln!("   Run with --verbose for details");
            }

            let exit_code = match e.category() {
                ErrorCategory::Validation => 2,
                ErrorCategory::NotFound => 3,
                ErrorCategory::Unauthorized => 4,
                ErrorCategory::Conflict => 5,
                ErrorCategory::Configuration => 1,
                ErrorCategory::System => 10,
            };
            std::process::exit(exit_code);
        }
    }

    Ok(())
}

fn profile(args: &ProfileArgs) -> ProviderProfile {
    ProviderProfile {
        provides_slots: args.slots,
        provides_weight: args.weight,
        slots_origin: args.slots_origin.clone(),
        slots_target: args.slots_target.clone(),
        weight_origin: args.weight_origin.clone(),
        weight_target: args.weight_target.clone(),
        notes: args.notes.clone(),
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, FillError> {
    Ok(serde_json::to_string_pretty(value)?)
}

async fn run(service: &FillService<MemoryStore>, cli: &CliConfig) -> Result<String, FillError> {
    let caller = UserId(cli.caller);

    match &cli.command {
        Command::Import { file } => {
            let data = tokio::fs::read(file).await?;
            let summary = import_seed(service.repository(), SeedFile::from_json(&data)?).await?;
            to_json(&summary)
        }
        Command::Provider(command) => match command {
            ProviderCommand::List => to_json(&service.list_providers().await?),
            ProviderCommand::Register(args) => {
                to_json(&service.register_provider(caller, profile(args)).await?)
            }
            ProviderCommand::Update { provider, profile: args } => to_json(
                &service
                    .update_provider(ProviderId(*provider), caller, profile(args))
                    .await?,
            ),
            ProviderCommand::Deactivate { provider } => to_json(
                &service
                    .deactivate_provider(ProviderId(*provider), caller)
                    .await?,
            ),
            ProviderCommand::Reactivate { provider } => to_json(
                &service
                    .reactivate_provider(ProviderId(*provider), caller)
                    .await?,
            ),
            ProviderCommand::Ledger { provider } => {
                to_json(&service.provider_ledger(ProviderId(*provider)).await?)
            }
        },
        Command::Points(args) => {
            let request = PointsRequest {
                provider_id: ProviderId(args.provider),
                points: args.points,
                reason: args.reason,
                activity_id: args.activity.map(ActivityId),
                note: args.note.clone(),
            };
            to_json(&service.add_points(request, caller).await?)
        }
        Command::Pair(command) => match command {
            PairCommand::Create {
                activity,
                fighter,
                transporter,
            } => to_json(
                &service
                    .create_pair(
                        ActivityId(*activity),
                        SignupId(*fighter),
                        SignupId(*transporter),
                        caller,
                    )
                    .await?,
            ),
            PairCommand::Update {
                pair,
                fighter,
                transporter,
            } => to_json(
                &service
                    .update_pair(
                        PairId(*pair),
                        SignupId(*fighter),
                        SignupId(*transporter),
                        caller,
                    )
                    .await?,
            ),
            PairCommand::Delete { pair } => {
                service.delete_pair(PairId(*pair), caller).await?;
                Ok(format!("🗑️ Pair {} deleted", pair))
            }
            PairCommand::Match { activity } => {
                // 每次 CLI 執行就是一個新的 session
                let mut session = MatchSession::new();
                to_json(
                    &service
                        .match_partners(ActivityId(*activity), &mut session)
                        .await?,
                )
            }
        },
        Command::Assign(command) => match command {
            AssignCommand::List { activity } => {
                to_json(&service.list_assignments(ActivityId(*activity)).await?)
            }
            AssignCommand::Auto { activity } => {
                let report = service.auto_assign(ActivityId(*activity), caller).await?;
                tracing::info!("✅ {} assignments created", report.created_count);
                to_json(&report)
            }
            AssignCommand::Create {
                activity,
                pair,
                provider,
                fill_type,
            } => {
                let request = AssignmentRequest {
                    activity_id: ActivityId(*activity),
                    pair_id: PairId(*pair),
                    provider_id: ProviderId(*provider),
                    fill_type: *fill_type,
                };
                to_json(&service.create_assignment(request, caller).await?)
            }
            AssignCommand::Delete { assignment } => {
                service
                    .delete_assignment(AssignmentId(*assignment), caller)
                    .await?;
                Ok(format!("🗑️ Assignment {} deleted", assignment))
            }
        },
        Command::RemoveActivity { activity } => {
            service
                .remove_activity(ActivityId(*activity), caller)
                .await?;
            Ok(format!("🗑️ Activity {} deleted", activity))
        }
    }
}
