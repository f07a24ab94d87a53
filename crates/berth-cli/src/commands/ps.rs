use super::{colorize_state, json_pretty, EXIT_SUCCESS};
use berth_core::ControlPlane;
use berth_schema::{ContainerStatus, Transit};

pub fn run(
    plane: &ControlPlane,
    env: Option<&str>,
    project: Option<&str>,
    json: bool,
) -> Result<u8, String> {
    let query = plane.query();
    let records = match (project, env) {
        (Some(project), env) => {
            let environment = env.unwrap_or(&plane.context().environment);
            query.list_by_project_and_environment(project, environment)
        }
        (None, Some(environment)) => query.list_by_environment(environment),
        (None, None) => query.list_all(),
    }
    .map_err(|e| e.to_string())?;

    if json {
        println!("{}", json_pretty(&records)?);
    } else if records.is_empty() {
        println!("no containers found");
    } else {
        println!(
            "{:<20} {:<10} {:<16} {:<11} {:<11} TRANSIT",
            "NAME", "ENV", "PROJECT", "TYPE", "STATE"
        );
        for status in &records {
            println!(
                "{:<20} {:<10} {:<16} {:<11} {:<11} {}",
                status.container_name,
                status.environment,
                status.project_id,
                status.container_type.as_str(),
                colorize_state(status.state.as_str()),
                transit_label(status)
            );
        }
    }
    Ok(EXIT_SUCCESS)
}

fn transit_label(status: &ContainerStatus) -> String {
    match &status.transit {
        Transit::Settled => "-".to_owned(),
        Transit::Pending { action, since } => {
            format!("{action} since {}", since.format("%H:%M:%S"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use berth_schema::{Action, ContainerType};

    #[test]
    fn transit_label_shows_pending_action() {
        let mut status = ContainerStatus::create_by_type("orders", "dev", ContainerType::Project);
        assert_eq!(transit_label(&status), "-");
        let now = status.updated_at;
        status.mark_pending(Action::Stop, now);
        assert!(transit_label(&status).starts_with("stop since "));
    }
}
