use super::{json_pretty, spin_fail, spin_ok, spinner, EXIT_SUCCESS};
use berth_core::{ControlPlane, CoreError, Outcome};
use berth_schema::{CommandRequest, ContainerType};

pub fn run(
    plane: &ControlPlane,
    container_type: ContainerType,
    name: &str,
    env: Option<&str>,
    request: &CommandRequest,
    json: bool,
) -> Result<u8, String> {
    let environment = env.unwrap_or(&plane.context().environment);
    let verb = request.command.as_deref().unwrap_or("");
    let result = with_spinner(json, &format!("{verb} {container_type} {name}..."), || {
        plane
            .dispatcher()
            .dispatch(environment, container_type, name, request)
    })?;
    print_outcome(name, environment, container_type, verb, result, json)
}

/// Deletion flow: backend failures come back as `unchanged`.
pub fn remove(
    plane: &ControlPlane,
    container_type: ContainerType,
    name: &str,
    env: Option<&str>,
    json: bool,
) -> Result<u8, String> {
    let environment = env.unwrap_or(&plane.context().environment);
    let result = with_spinner(json, &format!("removing {container_type} {name}..."), || {
        plane.dispatcher().delete(environment, container_type, name)
    })?;
    print_outcome(name, environment, container_type, "delete", result, json)
}

fn with_spinner(
    json: bool,
    msg: &str,
    op: impl FnOnce() -> Result<Outcome, CoreError>,
) -> Result<Outcome, String> {
    let pb = if json { None } else { Some(spinner(msg)) };
    match op() {
        Ok(outcome) => {
            if let Some(ref pb) = pb {
                spin_ok(pb, &outcome_word(outcome));
            }
            Ok(outcome)
        }
        Err(e) => {
            if let Some(ref pb) = pb {
                spin_fail(pb, "failed");
            }
            Err(e.to_string())
        }
    }
}

fn outcome_word(outcome: Outcome) -> String {
    match outcome {
        Outcome::Accepted => "accepted".to_owned(),
        Outcome::Unchanged => "unchanged".to_owned(),
    }
}

fn print_outcome(
    name: &str,
    environment: &str,
    container_type: ContainerType,
    verb: &str,
    outcome: Outcome,
    json: bool,
) -> Result<u8, String> {
    if json {
        let payload = serde_json::json!({
            "name": name,
            "environment": environment,
            "type": container_type,
            "command": verb,
            "outcome": outcome,
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!(
            "{}: {verb} {container_type} {name}@{environment}",
            outcome_word(outcome)
        );
    }
    Ok(EXIT_SUCCESS)
}
