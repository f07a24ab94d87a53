use super::{driver_binary, EXIT_FAILURE, EXIT_SUCCESS};
use berth_core::{open_store, Context};
use berth_runtime::BackendRegistry;
use berth_schema::{parse_definitions_file, BerthConfig};

pub fn run(config: &BerthConfig, json_output: bool) -> Result<u8, String> {
    let mut checks: Vec<Check> = Vec::new();
    let mut all_pass = true;

    let ctx = Context::from_config(config);
    checks.push(Check::info(
        "mode",
        &format!(
            "Deployment mode: {} (environment {}, namespace {})",
            ctx.mode, ctx.environment, ctx.namespace
        ),
    ));

    check_driver(config, &ctx, &mut checks, &mut all_pass);
    check_definitions(config, &mut checks, &mut all_pass);
    check_store(config, &mut checks, &mut all_pass);

    print_results(&checks, all_pass, json_output)
}

fn check_driver(config: &BerthConfig, ctx: &Context, checks: &mut Vec<Check>, all_pass: &mut bool) {
    let missing = berth_runtime::check_prereqs(ctx.mode, driver_binary(config, ctx.mode));
    if !missing.is_empty() {
        *all_pass = false;
        checks.push(Check::fail(
            "driver_prereqs",
            &format!(
                "Missing prerequisites: {}",
                berth_runtime::format_missing(&missing)
            ),
        ));
        return;
    }

    match BackendRegistry::from_config(config, ctx.mode).active() {
        Ok(backend) if backend.available() => checks.push(Check::pass(
            "driver",
            &format!("{} driver is available", backend.name()),
        )),
        Ok(backend) => checks.push(Check::warn(
            "driver",
            &format!(
                "{} is installed but not responding (daemon or cluster unreachable?)",
                backend.name()
            ),
        )),
        Err(e) => {
            *all_pass = false;
            checks.push(Check::fail("driver", &e.to_string()));
        }
    }
}

fn check_definitions(config: &BerthConfig, checks: &mut Vec<Check>, all_pass: &mut bool) {
    let Some(path) = &config.definitions else {
        checks.push(Check::info(
            "definitions",
            "No definitions file configured; run commands will have nothing to start",
        ));
        return;
    };
    match parse_definitions_file(path) {
        Ok(defs) => checks.push(Check::pass(
            "definitions",
            &format!(
                "Definitions loaded: {} project(s), {} dev service(s)",
                defs.projects.len(),
                defs.devservices.len()
            ),
        )),
        Err(e) => {
            *all_pass = false;
            checks.push(Check::fail("definitions", &format!("Definitions invalid: {e}")));
        }
    }
}

fn check_store(config: &BerthConfig, checks: &mut Vec<Check>, all_pass: &mut bool) {
    let store = match open_store(config) {
        Ok(store) => store,
        Err(e) => {
            *all_pass = false;
            checks.push(Check::fail("store_ready", &format!("Store unavailable: {e}")));
            return;
        }
    };
    if !store.is_ready() {
        *all_pass = false;
        checks.push(Check::fail("store_ready", "Status store is not ready"));
        return;
    }
    checks.push(Check::pass("store_ready", "Status store is ready"));

    match store.list() {
        Ok(records) => {
            let pending = records.iter().filter(|s| s.in_transit()).count();
            checks.push(Check::info(
                "records",
                &format!("{} container record(s) ({pending} pending)", records.len()),
            ));
        }
        Err(e) => checks.push(Check::warn(
            "records",
            &format!("Cannot list records: {e}"),
        )),
    }
}

fn print_results(checks: &[Check], all_pass: bool, json_output: bool) -> Result<u8, String> {
    if json_output {
        let json = serde_json::json!({
            "healthy": all_pass,
            "checks": checks.iter().map(|c| serde_json::json!({
                "name": c.name,
                "status": c.status,
                "message": c.message,
            })).collect::<Vec<_>>(),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&json).map_err(|e| e.to_string())?
        );
    } else {
        println!("Berth Doctor\n");
        for check in checks {
            let icon = match check.status {
                "pass" => "✓",
                "fail" => "✗",
                "warn" => "⚠",
                _ => "ℹ",
            };
            println!("  {icon} {}", check.message);
        }
        println!();
        if all_pass {
            println!("All checks passed.");
        } else {
            println!("Some checks failed. See above for details.");
        }
    }
    Ok(if all_pass { EXIT_SUCCESS } else { EXIT_FAILURE })
}

struct Check {
    name: &'static str,
    status: &'static str,
    message: String,
}

impl Check {
    fn new(name: &'static str, status: &'static str, message: &str) -> Self {
        Self {
            name,
            status,
            message: message.to_owned(),
        }
    }

    fn pass(name: &'static str, message: &str) -> Self {
        Self::new(name, "pass", message)
    }

    fn fail(name: &'static str, message: &str) -> Self {
        Self::new(name, "fail", message)
    }

    fn warn(name: &'static str, message: &str) -> Self {
        Self::new(name, "warn", message)
    }

    fn info(name: &'static str, message: &str) -> Self {
        Self::new(name, "info", message)
    }
}
