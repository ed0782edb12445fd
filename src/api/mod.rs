use rocket::Route;

mod announcements;
pub(crate) mod auth;
mod common;
mod emergencies;
mod fees;
mod maintenance;
mod meetings;
mod packages;
mod profiles;
mod residents;
mod stats;
mod visitors;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(auth::routes());
    routes.extend(profiles::routes());
    routes.extend(announcements::routes());
    routes.extend(maintenance::routes());
    routes.extend(fees::routes());
    routes.extend(residents::routes());
    routes.extend(visitors::routes());
    routes.extend(packages::routes());
    routes.extend(meetings::routes());
    routes.extend(emergencies::routes());
    routes.extend(stats::routes());
    routes
}
