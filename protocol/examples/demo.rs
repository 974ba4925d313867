//! Walkthrough of the satoshi-anchored identity lifecycle.
//!
//! Everything runs against the in-memory ledger: fund a satoshi, inscribe a
//! DID document on it through the commit/reveal flow, resolve it, issue a
//! credential signed by the DID, then burn the DID and watch verification
//! fail.
//!
//! Run with:
//!   cargo run --example demo

use std::sync::Arc;

use btco_protocol::config::{Network, ProtocolConfig, BURN_MARKER};
use btco_protocol::content::{content_info, prepare_content};
use btco_protocol::did::{create_did_document, serialize_did_document, DidDocumentOptions, DidResolver};
use btco_protocol::error::BtcoResult;
use btco_protocol::inscription::{CommitSigner, InscriptionEvent, InscriptionOrchestrator, InscriptionRequest, KeypairCommitSigner};
use btco_protocol::logging::{init_logging, LogFormat};
use btco_protocol::proof::{LocalSigner, PrivateKeyInput, ResolverDocumentLoader};
use btco_protocol::provider::{CreateInscriptionRequest, MemoryOrdinalsProvider, OrdinalsProvider};
use btco_protocol::vc::{CredentialIssuer, CredentialRequest};

// ---------------------------------------------------------------------------
// ANSI color constants
// ---------------------------------------------------------------------------

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const CYAN: &str = "\x1b[36m";

const SATOSHI: u64 = 1_066_296_127_976_657;

fn step(n: u32, title: &str) {
    println!();
    println!("{BOLD}{CYAN}[{n}]{RESET} {BOLD}{title}{RESET}");
}

fn detail(label: &str, value: impl std::fmt::Display) {
    println!("    {DIM}{label:<16}{RESET} {value}");
}

fn verdict(ok: bool) -> String {
    if ok {
        format!("{GREEN}verified{RESET}")
    } else {
        format!("{RED}rejected{RESET}")
    }
}

#[tokio::main]
async fn main() -> BtcoResult<()> {
    init_logging("warn", LogFormat::Pretty);

    let network = Network::Testnet;
    let config = ProtocolConfig::for_network(network);
    let provider = Arc::new(MemoryOrdinalsProvider::new(network));
    let resolver = Arc::new(
        DidResolver::from_config(&config).with_provider(network, provider.clone() as Arc<dyn OrdinalsProvider>),
    );
    let wallet = KeypairCommitSigner::generate(network);

    step(1, "Create a DID document");
    let created = create_did_document(SATOSHI, network, DidDocumentOptions::default())?;
    let did = created.document.id.clone();
    detail("did", &did);
    detail("key", &created.document.verification_method[0].public_key_multibase);

    step(2, "Inscribe it on the satoshi");
    let utxo = provider.fund(Some(SATOSHI), 250_000, wallet.change_script());
    let (mut orchestrator, mut events) = InscriptionOrchestrator::new(config.clone(), Some(provider.clone() as Arc<dyn OrdinalsProvider>));
    let request = InscriptionRequest::new(
        serialize_did_document(&created.document)?,
        "application/json",
        &wallet.address().to_string(),
    );
    let inscription_id = orchestrator.inscribe(request, &[utxo], Some(3), &wallet).await?;
    provider.mine_block();
    orchestrator.check_confirmation().await?;
    while let Ok(event) = events.try_recv() {
        match event {
            InscriptionEvent::FeesCalculated { fees, .. } => {
                detail("fees", format!("{} commit + {} reveal sats", fees.commit, fees.reveal))
            }
            InscriptionEvent::Confirmed { block_height, .. } => detail("confirmed at", block_height.unwrap_or_default()),
            _ => {}
        }
    }
    detail("inscription", &inscription_id);

    step(3, "Resolve the DID");
    let resolution = resolver.resolve(&did).await?;
    detail("document found", resolution.did_document.is_some());
    detail("deactivated", resolution.is_deactivated());

    step(4, "Issue a credential signed by the DID");
    let signer = LocalSigner::new(&PrivateKeyInput::RawBytes32(*created.secret_key), format!("{did}#key-1"))?;
    let issuer = CredentialIssuer::new(Arc::new(signer), Arc::new(ResolverDocumentLoader::new(resolver.clone())));
    let credential = issuer
        .issue(
            CredentialRequest::new(format!("{did}/0"), "", content_info(b"sunrise", "text/plain"))
                .with_title("Sunrise"),
        )
        .await?;
    detail("issued", &credential.issuance_date);
    detail("verification", verdict(issuer.verify(&credential).await.verified));

    step(5, "Burn the DID");
    provider
        .create_inscription(CreateInscriptionRequest {
            content: prepare_content(BURN_MARKER, "text/plain", None, None)?,
            satoshi: SATOSHI,
            destination: None,
        })
        .await?;
    resolver.invalidate(&did);
    detail("deactivated", resolver.resolve(&did).await?.is_deactivated());
    detail("verification", verdict(issuer.verify(&credential).await.verified));

    println!();
    Ok(())
}
