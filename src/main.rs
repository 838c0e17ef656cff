#[macro_use]
extern crate diesel;

use crate::auth::JwtContext;
use crate::db::DbInterface;
use actix_cors::Cors;
use actix_web::http::header;
use actix_web::web::{self, Data};
use actix_web::{App, HttpServer, Scope};
use anyhow::{Context, Result};
use std::net::Ipv6Addr;

mod api;
mod auth;
mod cli;
mod db;
mod logging;
mod settings;

#[actix_web::main]
async fn main() {
    try_or_exit(run()).await;
}

/// Wrapper of the main function. Correctly outputs the error to the logging utility or stderr.
async fn try_or_exit<T, F>(f: F) -> T
where
    F: std::future::Future<Output = Result<T>>,
{
    match f.await {
        Ok(ok) => ok,
        Err(err) => {
            if log::log_enabled!(log::Level::Error) {
                log::error!("Crashed with error: {:?}", err);
            } else {
                eprintln!("Crashed with error: {:?}", err);
            }

            std::process::exit(-1);
        }
    }
}

async fn run() -> Result<()> {
    let args = cli::parse_args();

    let settings = settings::Settings::load(&args.config)?;

    logging::init(args.verbose, args.logoutput.as_deref())?;

    log::info!("Starting meetmeet controller");

    db::migrations::start_migration(&settings.database)
        .await
        .context("Failed to migrate database")?;

    let db_ctx = Data::new(
        DbInterface::connect(settings.database).context("Failed to connect to database")?,
    );

    let jwt_ctx = Data::new(JwtContext::new(settings.auth));

    let cors = settings.http.cors;

    let http_server = HttpServer::new(move || {
        let cors = setup_cors(&cors);

        App::new()
            .wrap(cors)
            .app_data(web::JsonConfig::default().error_handler(api::v1::response::json_error_handler))
            .app_data(db_ctx.clone())
            .app_data(jwt_ctx.clone())
            .service(v1_scope(db_ctx.clone(), jwt_ctx.clone()))
    });

    let address = (Ipv6Addr::UNSPECIFIED, settings.http.port);

    let http_server = http_server
        .bind(address)
        .with_context(|| format!("Failed to bind http server to {}:{}", address.0, address.1))?;

    log::info!("Startup finished");

    http_server.run().await?;

    log::info!("Shutting down, goodbye!");

    Ok(())
}

fn v1_scope(db_ctx: Data<DbInterface>, jwt_ctx: Data<JwtContext>) -> Scope {
    // login and the public read endpoints stay outside of the authenticated scope
    web::scope("/v1")
        .service(api::v1::auth::login)
        .service(api::v1::meetups::all)
        .service(api::v1::meetups::get)
        .service(
            // empty scope to differentiate between auth endpoints
            web::scope("")
                .wrap(api::v1::middleware::token_auth::TokenAuth { db_ctx, jwt_ctx })
                .service(api::v1::users::current_user_profile)
                .service(api::v1::meetups::new)
                .service(api::v1::meetups::patch)
                .service(api::v1::meetups::delete)
                .service(api::v1::participations::toggle)
                .service(api::v1::participations::approve)
                .service(api::v1::participations::reject),
        )
}

fn setup_cors(settings: &settings::Cors) -> Cors {
    let mut cors = Cors::default();

    for origin in &settings.allowed_origin {
        cors = cors.allowed_origin(origin)
    }

    cors.allowed_header(header::CONTENT_TYPE)
        .allowed_header(header::AUTHORIZATION)
        .allow_any_method()
}
