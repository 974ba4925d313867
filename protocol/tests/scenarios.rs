//! Reference scenarios for the public API: inscription previews, DID
//! documents, proofs, resource URLs and content chunking.

use std::sync::Arc;

use serde_json::json;

use btco_protocol::config::{Network, VC_CONTEXT_V1};
use btco_protocol::content::{chunk_content, detect_content_type, prepare_content};
use btco_protocol::crypto::EdKeypair;
use btco_protocol::did::{
    create_did_document, deserialize_did_document, parse_did, serialize_did_document, DidDocumentOptions,
    DidResolver,
};
use btco_protocol::inscription::{create_inscription, parse_envelope, prevent_front_running};
use btco_protocol::proof::{
    create_proof, did_key_verification_method, verify_proof, PrivateKeyInput, ProofOptions, StaticDocumentLoader,
    VerifyOptions,
};
use btco_protocol::provider::{CreateInscriptionRequest, MemoryOrdinalsProvider, OrdinalsProvider};

#[test]
fn text_inscription_on_testnet() {
    let content = prepare_content("hello", "text/plain", None, None).unwrap();
    let preview = create_inscription(content, Network::Testnet, 2).unwrap();

    assert!(preview.commit_address.starts_with("tb1p"));
    let envelope = parse_envelope(&preview.reveal_script).expect("envelope");
    assert_eq!(envelope.body, b"hello");
    assert_eq!(envelope.content_type.as_deref(), Some("text/plain"));
    assert!(preview.commit_amount >= preview.reveal_fee + preview.postage);
}

#[test]
fn mainnet_did_document() {
    let created = create_did_document(12345, Network::Mainnet, DidDocumentOptions::default()).unwrap();
    let document = &created.document;

    assert_eq!(document.id, "did:btco:12345");
    assert_eq!(document.verification_method.len(), 1);
    let key = document.verification_method[0].ed25519_key().expect("ed25519 key");
    assert_eq!(key.as_bytes().len(), 32);
    assert_eq!(document.authentication, vec!["did:btco:12345#key-1".to_string()]);

    let json = serialize_did_document(document).unwrap();
    assert_eq!(deserialize_did_document(&json).as_ref(), Some(document));
    assert_eq!(deserialize_did_document("{\"id\": 5}"), None);
    assert_eq!(parse_did(&document.id).unwrap().satoshi(), 12345);
}

#[tokio::test]
async fn proof_round_trip_and_wrong_key() {
    let loader = StaticDocumentLoader::new();
    let document = json!({
        "@context": [VC_CONTEXT_V1],
        "type": ["VerifiableCredential"],
        "credentialSubject": {"id": "did:btco:12345"}
    });

    let signer = EdKeypair::generate();
    let options = ProofOptions::new(did_key_verification_method(&signer.public_key()));
    let proof = create_proof(&document, &options, &PrivateKeyInput::from(&signer), &loader)
        .await
        .unwrap();
    assert!(proof.proof_value.as_deref().is_some_and(|v| v.starts_with('z')));
    assert!(verify_proof(&document, &proof, &VerifyOptions::default(), &loader).await.verified);

    let impostor = EdKeypair::generate();
    let mut forged = proof.clone();
    forged.verification_method = did_key_verification_method(&impostor.public_key());
    let result = verify_proof(&document, &forged, &VerifyOptions::default(), &loader).await;
    assert!(!result.verified);
    assert!(!result.errors().is_empty());
}

#[tokio::test]
async fn resource_info_urls_return_json() {
    let provider = Arc::new(MemoryOrdinalsProvider::new(Network::Mainnet));
    provider
        .create_inscription(CreateInscriptionRequest {
            content: prepare_content(vec![1u8, 2, 3], "image/png", None, None).unwrap(),
            satoshi: 777,
            destination: None,
        })
        .await
        .unwrap();
    let resolver = DidResolver::new().with_provider(Network::Mainnet, provider as Arc<dyn OrdinalsProvider>);

    for url in ["did:btco:777/0/info", "did:btco:777/0?format=application/json"] {
        let resolution = resolver.resolve_resource(url).await.unwrap();
        assert_eq!(resolution.error(), None, "{url}");
        assert_eq!(resolution.content_type(), Some("application/json"), "{url}");
    }
    let raw = resolver.resolve_resource("did:btco:777/0").await.unwrap();
    assert_eq!(raw.content_type(), Some("image/png"));
}

#[test]
fn chunking_is_lossless() {
    let content: Vec<u8> = (0..1000u32).map(|i| (i % 251) as u8).collect();
    let chunks = chunk_content(&content, 100).unwrap();
    assert_eq!(chunks.len(), 10);
    assert!(chunks.iter().all(|chunk| chunk.len() == 100));
    assert_eq!(chunks.concat(), content);
}

#[test]
fn json_detection() {
    assert_eq!(detect_content_type(Some("doc.json"), None, None), "application/json");
    assert_eq!(detect_content_type(None, Some(br#"{"a": 1}"#.as_slice()), None), "application/json");
}

#[tokio::test]
async fn front_running_guard() {
    let provider = MemoryOrdinalsProvider::new(Network::Mainnet);
    let inscribe = |n: u8| CreateInscriptionRequest {
        content: prepare_content(vec![n], "application/octet-stream", None, None).unwrap(),
        satoshi: 99,
        destination: None,
    };
    provider.create_inscription(inscribe(1)).await.unwrap();
    assert!(prevent_front_running(&provider, 99).await.unwrap());
    provider.create_inscription(inscribe(2)).await.unwrap();
    assert!(!prevent_front_running(&provider, 99).await.unwrap());
}
