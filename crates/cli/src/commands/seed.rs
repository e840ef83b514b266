use crate::commands::{load_config, runtime, CommandResult};
use tripxl_db::{connect_with_config, migrations, FleetSeedDataset, ScopeSeedInfo};

pub fn run() -> CommandResult {
    let config = match load_config("seed") {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match runtime("seed") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = connect_with_config(&config.database)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;

        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;

        let seed_result = FleetSeedDataset::load(&pool)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 5u8))?;

        let verification = FleetSeedDataset::verify(&pool)
            .await
            .map_err(|error| ("seed_verification", error.to_string(), 6u8))?;

        let run_result = if verification.all_present {
            Ok(SeedOutput {
                scopes: seed_result.scopes_seeded,
                vehicles: seed_result.vehicles_seeded,
            })
        } else {
            Err(("seed_verification", verification_message(&verification.checks), 6u8))
        };

        pool.close().await;
        run_result
    });

    match result {
        Ok(output) => {
            let scope_lines: Vec<String> = output
                .scopes
                .iter()
                .map(|scope| {
                    format!(
                        "  - {}: {} ({})",
                        scope.workflow_id, scope.levels_required, scope.description
                    )
                })
                .collect();
            let message = format!(
                "demo fleet loaded: {} vehicles, {} approval scopes:\n{}",
                output.vehicles,
                output.scopes.len(),
                scope_lines.join("\n")
            );
            CommandResult::success("seed", message)
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("seed", error_class, message, exit_code)
        }
    }
}

struct SeedOutput {
    scopes: Vec<ScopeSeedInfo>,
    vehicles: usize,
}

fn verification_message(checks: &[(&'static str, bool)]) -> String {
    let failed_checks =
        checks.iter().filter_map(|(check, passed)| (!passed).then_some(*check)).collect::<Vec<_>>();
    if failed_checks.is_empty() {
        "some seed data failed to load".to_string()
    } else {
        format!("seed verification failed for checks: {}", failed_checks.join(", "))
    }
}
