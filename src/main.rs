#[macro_use]
extern crate rocket;

#[launch]
fn rocket() -> _ {
    let rocket = cards_api::rocket();
    log::info!("Starting Cards API Server");
    rocket
}
