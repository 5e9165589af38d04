//src/main.rs

use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use goldtrace::{
    config::{AppState, Config},
    routes::router,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Inicializa o logger; RUST_LOG sobrescreve o filtro padrão
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("goldtrace=info,tower_http=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    // Se a configuração falhar, a aplicação não deve iniciar
    let config = Config::from_env()?;
    let pool = config.connect().await?;

    // Faz o app rodar as migrações do SQLx na inicialização
    sqlx::migrate!().run(&pool).await?;
    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    let app = router(AppState::postgres(&config, pool));

    // Inicia o servidor
    let listener = TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Servidor encerrado");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Falha ao escutar o sinal de encerramento: {}", e);
    }
}
