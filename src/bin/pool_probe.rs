// DANS : src/bin/pool_probe.rs

//! Parcours complet contre un nœud réel : version du contrat, création d'un pool 9/6 décimales
//! au ratio 1:1000, mint vers le payeur, dépôt, swap, retrait, puis relecture du pool.

use anyhow::{anyhow, Context, Result};
use frt_load::{
    config::Config,
    execution::TransactionEngine,
    monitoring::logging::setup_logging,
    ratio::Direction,
    rpc::{ResilientRpcClient, RpcTransport},
    state::{JsonPoolStore, PoolCreationRequest, PoolManager, PoolOrigin},
};
use solana_sdk::{signature::read_keypair_file, signer::Signer};
use std::sync::Arc;
use tracing::{info, warn};

const DECIMALS_A: u8 = 9;
const DECIMALS_B: u8 = 6;
const RATIO_WHOLE: u64 = 1_000;

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging();

    // 1. Configuration et portefeuille payeur
    let config = Config::load()?;
    let keypair_path = config
        .payer_keypair_path
        .clone()
        .context("PAYER_KEYPAIR_PATH est requis pour ce binaire")?;
    let payer = read_keypair_file(&keypair_path)
        .map_err(|e| anyhow!("Lecture du keypair '{}' impossible : {}", keypair_path, e))?;
    info!(payer = %payer.pubkey(), rpc = %config.solana_rpc_url, "Démarrage de la sonde.");

    // 2. Transport, moteur, gestionnaire de pools
    let transport: Arc<dyn RpcTransport> = Arc::new(ResilientRpcClient::new(
        config.solana_rpc_url.clone(),
        config.rpc_max_retries,
        config.rpc_retry_delay_ms,
    ));
    let engine = Arc::new(
        TransactionEngine::new(
            transport,
            config.program_id()?,
            config.compute_budgets()?,
            config.retry_policy(),
            config.confirmation_policy(),
        )
        .with_airdrop_fallback(config.airdrop_fallback),
    );
    let store = Arc::new(JsonPoolStore::new(&config.pool_store_path));
    let manager = PoolManager::new(engine.clone(), store);

    let balance = engine.sol_balance(&payer.pubkey()).await?;
    info!(lamports = balance, "Solde du payeur.");

    match manager.program_version(&payer).await? {
        Some(version) => info!(version = %version, "Contrat joignable."),
        None => warn!("Version du contrat introuvable dans les logs."),
    }

    // 3. Création du pool
    let pool = manager
        .create_pool(
            &payer,
            PoolCreationRequest {
                decimals_a: DECIMALS_A,
                decimals_b: DECIMALS_B,
                ratio_whole: RATIO_WHOLE,
                direction: Direction::AToB,
                existing_mints: None,
            },
        )
        .await?;
    if pool.origin == PoolOrigin::FallbackSimulated {
        warn!(pool = %pool.pool_id(), "Pool de repli : on s'arrête là.");
        return Ok(());
    }
    let addresses = &pool.addresses;

    // 4. Liquidité et swap
    let one_a = 10u64.pow(pool.decimals_a as u32);
    let one_b = 10u64.pow(pool.decimals_b as u32);
    manager
        .mint_tokens(&payer, &addresses.token_a_mint, &payer.pubkey(), 100 * one_a)
        .await?;
    manager
        .mint_tokens(&payer, &addresses.token_b_mint, &payer.pubkey(), 100_000 * one_b)
        .await?;

    engine.deposit(&payer, addresses, &addresses.token_b_mint, 50_000 * one_b).await?;
    engine.swap(&payer, addresses, &addresses.token_a_mint, one_a, 0).await?;

    let lp_balance = engine.token_balance(&payer.pubkey(), &addresses.lp_token_b_mint).await?;
    engine.withdraw(&payer, addresses, &addresses.token_b_mint, lp_balance / 2).await?;

    // 5. Relecture
    let lookup = manager.get_pool(&pool.pool_id()).await?;
    info!(lookup = ?lookup, "Parcours terminé.");
    Ok(())
}
