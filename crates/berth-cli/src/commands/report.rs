use super::{json_pretty, EXIT_SUCCESS};
use berth_core::ControlPlane;
use berth_schema::{ContainerState, ContainerType, StatusReport};

pub struct ReportArgs {
    pub name: String,
    pub environment: Option<String>,
    pub container_type: ContainerType,
    pub state: ContainerState,
    pub container_id: Option<String>,
    pub image: Option<String>,
}

pub fn run(plane: &ControlPlane, args: ReportArgs, json: bool) -> Result<u8, String> {
    let environment = args
        .environment
        .unwrap_or_else(|| plane.context().environment.clone());
    let mut report = StatusReport::new(args.name, environment, args.container_type, args.state);
    report.container_id = args.container_id;
    report.image = args.image;

    let status = plane
        .engine()
        .apply_report(&report)
        .map_err(|e| e.to_string())?;

    if json {
        println!("{}", json_pretty(&status)?);
    } else {
        println!("{} is {}", status.key(), status.state);
    }
    Ok(EXIT_SUCCESS)
}
