//! Route configuration
//!
//! Each domain wires its own scope; authenticated surfaces wrap
//! JwtAuthMiddleware at the scope level.

use actix_web::web;

use crate::handlers;
use crate::middleware::JwtAuthMiddleware;

/// Configure all routes for the application
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .route("/health", web::get().to(handlers::health_check))
            .route("/health/ready", web::get().to(handlers::readiness_check))
            .configure(routes::auth::configure)
            .configure(routes::users::configure)
            .configure(routes::votes::configure)
            .configure(routes::comments::configure),
    );
}

// Sub-modules for each domain
mod routes {
    use super::*;

    pub mod auth {
        use super::*;
        pub fn configure(cfg: &mut web::ServiceConfig) {
            cfg.service(
                web::scope("/auth")
                    .route("/register", web::post().to(handlers::register))
                    .route("/login", web::post().to(handlers::login))
                    .route("/refresh", web::post().to(handlers::refresh_token))
                    .route(
                        "/oauth/{provider}/authorize",
                        web::get().to(handlers::oauth_authorize),
                    )
                    .route(
                        "/oauth/{provider}/callback",
                        web::post().to(handlers::oauth_callback),
                    ),
            );
        }
    }

    pub mod users {
        use super::*;
        pub fn configure(cfg: &mut web::ServiceConfig) {
            cfg.service(
                web::scope("/users/me")
                    .wrap(JwtAuthMiddleware)
                    .route("", web::get().to(handlers::get_me))
                    .route("", web::patch().to(handlers::update_me)),
            )
            .service(
                web::scope("/users")
                    .route("/{id}", web::get().to(handlers::get_user))
                    .route("/{id}/followers", web::get().to(handlers::get_followers))
                    .route("/{id}/following", web::get().to(handlers::get_following))
                    .service(
                        web::scope("")
                            .wrap(JwtAuthMiddleware)
                            .route("/{id}/follow", web::post().to(handlers::follow_user))
                            .route("/{id}/follow", web::delete().to(handlers::unfollow_user)),
                    ),
            );
        }
    }

    pub mod votes {
        use super::*;
        pub fn configure(cfg: &mut web::ServiceConfig) {
            cfg.service(
                web::scope("/votes")
                    .wrap(JwtAuthMiddleware)
                    .route("", web::post().to(handlers::create_vote))
                    .route("", web::get().to(handlers::list_votes))
                    .route("/popular", web::get().to(handlers::popular_votes))
                    .route("/search", web::get().to(handlers::search_votes))
                    .route("/{id}", web::get().to(handlers::get_vote))
                    .route("/{id}", web::patch().to(handlers::update_vote))
                    .route("/{id}", web::delete().to(handlers::delete_vote))
                    .route("/{id}/picks", web::post().to(handlers::cast_picks))
                    .route("/{id}/comments", web::post().to(handlers::create_comment))
                    .route("/{id}/comments", web::get().to(handlers::list_comments)),
            );
        }
    }

    pub mod comments {
        use super::*;
        pub fn configure(cfg: &mut web::ServiceConfig) {
            cfg.service(
                web::scope("/comments")
                    .wrap(JwtAuthMiddleware)
                    .route("/{id}", web::patch().to(handlers::update_comment))
                    .route("/{id}", web::delete().to(handlers::delete_comment))
                    .route("/{id}/like", web::post().to(handlers::like_comment))
                    .route("/{id}/like", web::delete().to(handlers::unlike_comment)),
            );
        }
    }
}
