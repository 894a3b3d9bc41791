pub mod auth;
pub mod chats;
pub mod orders;
pub mod providers;
pub mod quotes;

use actix_web::web;

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    // ── Auth routes (protected by JWT via the AuthenticatedUser extractor) ──
    cfg.service(
        web::scope("/auth")
            .route("/me", web::get().to(auth::me))
            .route("/complete-profile", web::post().to(auth::complete_profile)),
    );

    // ── Quote routes ──
    cfg.service(
        web::scope("/quotes")
            .route("", web::get().to(quotes::list_quotes))
            .route("", web::post().to(quotes::create_quote))
            .route("/{id}", web::get().to(quotes::get_quote)),
    );

    // ── Conversation routes ──
    cfg.service(
        web::scope("/chats")
            .route("", web::get().to(chats::list_chats))
            .route("", web::post().to(chats::open_chat))
            .route("/{id}", web::get().to(chats::get_chat))
            .route("/{id}/messages", web::post().to(chats::send_message))
            .route("/{id}/offers/accept", web::post().to(chats::accept_offer))
            .route("/{id}/offers/decline", web::post().to(chats::decline_offer)),
    );

    // ── Order routes ──
    cfg.service(
        web::scope("/orders")
            .route("", web::get().to(orders::list_orders))
            .route("/{id}", web::get().to(orders::get_order))
            .route("/{id}/status", web::put().to(orders::update_status))
            .route("/{id}/proof", web::put().to(orders::attach_proof))
            .route("/{id}/review", web::post().to(orders::submit_review)),
    );

    // ── Provider routes ──
    cfg.service(
        web::scope("/providers")
            .route("/{id}/rating", web::get().to(providers::get_rating))
            .route("/{id}/reviews", web::get().to(providers::get_reviews)),
    );
}
