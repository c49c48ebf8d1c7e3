use crate::{
    api::{attendance, child, coach, event, group, message},
    config::Config,
    error::AppError,
};
use actix_governor::{Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware};
use actix_web::web;
use std::sync::Arc;

/// Extractor failures go through `AppError` so every 4xx has the same shape.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(64 * 1024)
        .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into())
}

pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default()
        .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into())
}

pub fn path_config() -> web::PathConfig {
    web::PathConfig::default()
        .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into())
}

// Helper to build per-route limiter
fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
    let requests_per_min = requests_per_min.max(1);
    let per_ms = (60_000 / u64::from(requests_per_min)).max(1);
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .unwrap_or_default();
    Governor::new(&cfg)
}

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    let api_limiter = Arc::new(build_limiter(config.rate_protected_per_min));
    let bulk_limiter = Arc::new(build_limiter(config.rate_write_per_min));

    cfg.app_data(json_config())
        .app_data(query_config())
        .app_data(path_config());

    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(api_limiter) // rate limiting
            .service(
                web::scope("/attendance")
                    // /attendance
                    .service(
                        web::resource("")
                            .route(web::get().to(attendance::list_attendance))
                            .route(web::post().to(attendance::mark_attendance))
                            .route(web::patch().to(attendance::mark_attendance)),
                    )
                    // /attendance/mark-all-present
                    .service(
                        web::resource("/mark-all-present")
                            .wrap(bulk_limiter)
                            .route(web::post().to(attendance::mark_all_present)),
                    )
                    // /attendance/child/{id}
                    .service(
                        web::resource("/child/{id}")
                            .route(web::get().to(attendance::child_history)),
                    ),
            )
            .service(
                web::scope("/groups")
                    .service(
                        web::resource("")
                            .route(web::get().to(group::list_groups))
                            .route(web::post().to(group::create_group)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(group::get_group))
                            .route(web::put().to(group::update_group))
                            .route(web::delete().to(group::delete_group)),
                    ),
            )
            .service(
                web::scope("/children")
                    .service(
                        web::resource("")
                            .route(web::get().to(child::list_children))
                            .route(web::post().to(child::create_child)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(child::get_child))
                            .route(web::put().to(child::update_child))
                            .route(web::delete().to(child::delete_child)),
                    ),
            )
            .service(
                web::scope("/coaches")
                    .service(
                        web::resource("")
                            .route(web::get().to(coach::list_coaches))
                            .route(web::post().to(coach::create_coach)),
                    )
                    // registered before /{id} so it is not parsed as an id
                    .service(
                        web::resource("/email-available")
                            .route(web::get().to(coach::email_available)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(coach::get_coach))
                            .route(web::put().to(coach::update_coach))
                            .route(web::delete().to(coach::delete_coach)),
                    ),
            )
            .service(
                web::scope("/events")
                    .service(
                        web::resource("")
                            .route(web::get().to(event::list_events))
                            .route(web::post().to(event::create_event)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(event::get_event))
                            .route(web::put().to(event::update_event))
                            .route(web::delete().to(event::delete_event)),
                    ),
            )
            .service(
                web::scope("/messages")
                    .service(
                        web::resource("")
                            .route(web::get().to(message::list_messages))
                            .route(web::post().to(message::create_message)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(message::get_message))
                            .route(web::delete().to(message::delete_message)),
                    ),
            ),
    );
}
