pub mod entries;
pub mod rounds;
pub mod stickers;

/// Configures the web app by adding services from each web file.
///
/// Handlers expect a `web::Data<EntryService>` in app data.
pub fn configure(conf: &mut actix_web::web::ServiceConfig) {
    entries::configure(conf);
    rounds::configure(conf);
    stickers::configure(conf);
}
