//! End-to-end login (assertion) ceremony tests: signature verification,
//! sign-counter cloning defense, and user binding

mod common;

use chrono::Utc;
use passkey_core::webauthn::authenticator_data::flags;
use passkey_core::{
    MemoryPasskeyStore, PasskeyError, PasskeyService, PasskeySettings, UserPasskeyInfo,
};

use common::{
    assertion_json, client_data_json, test_user, SyntheticAuthenticator, ORIGIN, RP_ID,
};

const CREDENTIAL_ID: [u8; 16] = [
    0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b, 0x0c, 0x0d, 0x0e, 0x0f,
    0x10,
];

fn test_settings() -> PasskeySettings {
    PasskeySettings {
        rp_id: RP_ID.to_string(),
        rp_name: "Example".to_string(),
        rp_origin: ORIGIN.to_string(),
        ..PasskeySettings::default()
    }
}

fn stored_passkey(authenticator: &SyntheticAuthenticator, sign_count: u32) -> UserPasskeyInfo {
    UserPasskeyInfo {
        credential_id: authenticator.credential_id.clone(),
        public_key: authenticator.cose_public_key(),
        sign_count,
        transports: vec!["internal".to_string()],
        is_user_verified: true,
        is_backup_eligible: false,
        is_backed_up: false,
        created_at: Utc::now(),
        attestation_object: Vec::new(),
        client_data_json: Vec::new(),
    }
}

/// Service with one registered user and one stored ES256 credential
fn service_with_credential(
    authenticator: &SyntheticAuthenticator,
    stored_sign_count: u32,
) -> PasskeyService<MemoryPasskeyStore> {
    let store = MemoryPasskeyStore::new();
    let user = test_user();
    store.insert_user(user.clone());
    store.insert_passkey(&user.id, stored_passkey(authenticator, stored_sign_count));
    PasskeyService::new(test_settings(), store)
}

/// Drive a full assertion with the given presented counter and flags
async fn assert_with(
    service: &PasskeyService<MemoryPasskeyStore>,
    authenticator: &SyntheticAuthenticator,
    presented_sign_count: u32,
    flag_bits: u8,
) -> Result<passkey_core::passkey::AssertionSuccess, PasskeyError> {
    let user = test_user();
    let (options, state) = service
        .request_options(Some(&user.id))
        .await
        .expect("options should be created");

    let client_data = client_data_json("webauthn.get", &options.challenge, ORIGIN);
    let auth_data = authenticator.assertion_auth_data(flag_bits, presented_sign_count);
    let signature = authenticator.sign(&auth_data, &client_data);
    let credential = assertion_json(
        &authenticator.credential_id,
        &client_data,
        &auth_data,
        &signature,
        Some(&user.id),
    );

    let encoded = state.encode().expect("state should encode");
    service.verify_assertion(&credential, Some(&encoded)).await
}

#[tokio::test]
async fn es256_assertion_round_trip() {
    let authenticator = SyntheticAuthenticator::new(CREDENTIAL_ID.to_vec());
    let service = service_with_credential(&authenticator, 5);

    let success = assert_with(
        &service,
        &authenticator,
        6,
        flags::USER_PRESENT | flags::USER_VERIFIED,
    )
    .await
    .expect("assertion should verify");

    assert_eq!(success.user, test_user());
    assert_eq!(success.passkey.credential_id, CREDENTIAL_ID.to_vec());
    assert_eq!(success.passkey.sign_count, 6, "counter must be updated");
}

#[tokio::test]
async fn replayed_sign_count_is_rejected() {
    let authenticator = SyntheticAuthenticator::new(CREDENTIAL_ID.to_vec());
    let service = service_with_credential(&authenticator, 5);

    // Equal counter with a valid signature still fails: cloning defense
    assert_eq!(
        assert_with(
            &service,
            &authenticator,
            5,
            flags::USER_PRESENT | flags::USER_VERIFIED,
        )
        .await
        .unwrap_err(),
        PasskeyError::SignCountNotIncreasing {
            presented: 5,
            stored: 5,
        }
    );
}

#[tokio::test]
async fn regressed_sign_count_is_rejected() {
    let authenticator = SyntheticAuthenticator::new(CREDENTIAL_ID.to_vec());
    let service = service_with_credential(&authenticator, 5);

    assert_eq!(
        assert_with(
            &service,
            &authenticator,
            4,
            flags::USER_PRESENT | flags::USER_VERIFIED,
        )
        .await
        .unwrap_err(),
        PasskeyError::SignCountNotIncreasing {
            presented: 4,
            stored: 5,
        }
    );
}

#[tokio::test]
async fn counterless_authenticators_stay_at_zero() {
    let authenticator = SyntheticAuthenticator::new(CREDENTIAL_ID.to_vec());
    let service = service_with_credential(&authenticator, 0);

    let success = assert_with(
        &service,
        &authenticator,
        0,
        flags::USER_PRESENT | flags::USER_VERIFIED,
    )
    .await
    .expect("zero/zero counters mean no counter support");
    assert_eq!(success.passkey.sign_count, 0);
}

#[tokio::test]
async fn assertion_with_extension_data_verifies() {
    let authenticator = SyntheticAuthenticator::new(CREDENTIAL_ID.to_vec());
    let service = service_with_credential(&authenticator, 5);
    let user = test_user();
    let (options, state) = service
        .request_options(Some(&user.id))
        .await
        .expect("options should be created");

    // {"example.extension": true}
    let mut extensions = Vec::new();
    ciborium::ser::into_writer(
        &ciborium::value::Value::Map(vec![(
            ciborium::value::Value::Text("example.extension".to_string()),
            ciborium::value::Value::Bool(true),
        )]),
        &mut extensions,
    )
    .expect("CBOR encoding should succeed");

    let client_data = client_data_json("webauthn.get", &options.challenge, ORIGIN);
    let auth_data = authenticator.assertion_auth_data_with_extensions(
        flags::USER_PRESENT | flags::USER_VERIFIED,
        6,
        extensions,
    );
    let signature = authenticator.sign(&auth_data, &client_data);
    let credential = assertion_json(
        &authenticator.credential_id,
        &client_data,
        &auth_data,
        &signature,
        Some(&user.id),
    );

    let encoded = state.encode().expect("state should encode");
    let success = service
        .verify_assertion(&credential, Some(&encoded))
        .await
        .expect("extension data must not break verification");
    assert_eq!(success.passkey.sign_count, 6);
}

#[tokio::test]
async fn tampered_authenticator_data_fails_the_signature() {
    let authenticator = SyntheticAuthenticator::new(CREDENTIAL_ID.to_vec());
    let service = service_with_credential(&authenticator, 5);
    let user = test_user();
    let (options, state) = service
        .request_options(Some(&user.id))
        .await
        .expect("options should be created");

    let client_data = client_data_json("webauthn.get", &options.challenge, ORIGIN);
    let mut auth_data =
        authenticator.assertion_auth_data(flags::USER_PRESENT | flags::USER_VERIFIED, 6);
    let signature = authenticator.sign(&auth_data, &client_data);
    // Flip one bit of the sign counter after signing; the data still
    // parses but no longer matches the signature
    auth_data[36] ^= 0x01;
    let credential = assertion_json(
        &authenticator.credential_id,
        &client_data,
        &auth_data,
        &signature,
        Some(&user.id),
    );

    let encoded = state.encode().expect("state should encode");
    assert_eq!(
        service
            .verify_assertion(&credential, Some(&encoded))
            .await
            .unwrap_err(),
        PasskeyError::InvalidAssertionSignature
    );
}

#[tokio::test]
async fn signature_from_another_key_is_rejected() {
    let authenticator = SyntheticAuthenticator::new(CREDENTIAL_ID.to_vec());
    let impostor = SyntheticAuthenticator::new(CREDENTIAL_ID.to_vec());
    let service = service_with_credential(&authenticator, 5);
    let user = test_user();
    let (options, state) = service
        .request_options(Some(&user.id))
        .await
        .expect("options should be created");

    let client_data = client_data_json("webauthn.get", &options.challenge, ORIGIN);
    let auth_data =
        impostor.assertion_auth_data(flags::USER_PRESENT | flags::USER_VERIFIED, 6);
    let signature = impostor.sign(&auth_data, &client_data);
    let credential = assertion_json(
        &authenticator.credential_id,
        &client_data,
        &auth_data,
        &signature,
        Some(&user.id),
    );

    let encoded = state.encode().expect("state should encode");
    assert_eq!(
        service
            .verify_assertion(&credential, Some(&encoded))
            .await
            .unwrap_err(),
        PasskeyError::InvalidAssertionSignature
    );
}

#[tokio::test]
async fn unknown_credential_is_not_owned() {
    let authenticator = SyntheticAuthenticator::new(CREDENTIAL_ID.to_vec());
    let stranger = SyntheticAuthenticator::new(vec![0xff; 16]);
    let service = service_with_credential(&authenticator, 0);

    assert_eq!(
        assert_with(
            &service,
            &stranger,
            1,
            flags::USER_PRESENT | flags::USER_VERIFIED,
        )
        .await
        .unwrap_err(),
        PasskeyError::CredentialNotOwned
    );
}

#[tokio::test]
async fn user_handle_must_match_the_ceremony_user() {
    let authenticator = SyntheticAuthenticator::new(CREDENTIAL_ID.to_vec());
    let service = service_with_credential(&authenticator, 0);
    let user = test_user();
    let (options, state) = service
        .request_options(Some(&user.id))
        .await
        .expect("options should be created");

    let client_data = client_data_json("webauthn.get", &options.challenge, ORIGIN);
    let auth_data =
        authenticator.assertion_auth_data(flags::USER_PRESENT | flags::USER_VERIFIED, 1);
    let signature = authenticator.sign(&auth_data, &client_data);
    let credential = assertion_json(
        &authenticator.credential_id,
        &client_data,
        &auth_data,
        &signature,
        Some("c29tZW9uZS1lbHNl"),
    );

    let encoded = state.encode().expect("state should encode");
    assert_eq!(
        service
            .verify_assertion(&credential, Some(&encoded))
            .await
            .unwrap_err(),
        PasskeyError::UserHandleMismatch
    );
}

#[tokio::test]
async fn discoverable_credential_resolves_the_user_from_the_handle() {
    let authenticator = SyntheticAuthenticator::new(CREDENTIAL_ID.to_vec());
    let service = service_with_credential(&authenticator, 0);
    let user = test_user();
    // No user hint in the ceremony state
    let (options, state) = service
        .request_options(None)
        .await
        .expect("options should be created");
    assert!(options.allow_credentials.is_empty());

    let client_data = client_data_json("webauthn.get", &options.challenge, ORIGIN);
    let auth_data =
        authenticator.assertion_auth_data(flags::USER_PRESENT | flags::USER_VERIFIED, 1);
    let signature = authenticator.sign(&auth_data, &client_data);
    let credential = assertion_json(
        &authenticator.credential_id,
        &client_data,
        &auth_data,
        &signature,
        Some(&user.id),
    );

    let encoded = state.encode().expect("state should encode");
    let success = service
        .verify_assertion(&credential, Some(&encoded))
        .await
        .expect("handle should resolve the user");
    assert_eq!(success.user, user);
}

#[tokio::test]
async fn anonymous_assertion_without_a_handle_is_rejected() {
    let authenticator = SyntheticAuthenticator::new(CREDENTIAL_ID.to_vec());
    let service = service_with_credential(&authenticator, 0);
    let (options, state) = service
        .request_options(None)
        .await
        .expect("options should be created");

    let client_data = client_data_json("webauthn.get", &options.challenge, ORIGIN);
    let auth_data =
        authenticator.assertion_auth_data(flags::USER_PRESENT | flags::USER_VERIFIED, 1);
    let signature = authenticator.sign(&auth_data, &client_data);
    let credential = assertion_json(
        &authenticator.credential_id,
        &client_data,
        &auth_data,
        &signature,
        None,
    );

    let encoded = state.encode().expect("state should encode");
    assert_eq!(
        service
            .verify_assertion(&credential, Some(&encoded))
            .await
            .unwrap_err(),
        PasskeyError::MissingUserHandle
    );
}

#[tokio::test]
async fn backup_eligibility_may_not_change_after_registration() {
    let authenticator = SyntheticAuthenticator::new(CREDENTIAL_ID.to_vec());
    // Stored as not backup eligible, presented as eligible
    let service = service_with_credential(&authenticator, 0);

    assert_eq!(
        assert_with(
            &service,
            &authenticator,
            1,
            flags::USER_PRESENT | flags::USER_VERIFIED | flags::BACKUP_ELIGIBLE,
        )
        .await
        .unwrap_err(),
        PasskeyError::BackupStateMismatch
    );
}

#[tokio::test]
async fn wrong_ceremony_type_in_client_data_is_rejected() {
    let authenticator = SyntheticAuthenticator::new(CREDENTIAL_ID.to_vec());
    let service = service_with_credential(&authenticator, 0);
    let user = test_user();
    let (options, state) = service
        .request_options(Some(&user.id))
        .await
        .expect("options should be created");

    let client_data = client_data_json("webauthn.create", &options.challenge, ORIGIN);
    let auth_data =
        authenticator.assertion_auth_data(flags::USER_PRESENT | flags::USER_VERIFIED, 1);
    let signature = authenticator.sign(&auth_data, &client_data);
    let credential = assertion_json(
        &authenticator.credential_id,
        &client_data,
        &auth_data,
        &signature,
        Some(&user.id),
    );

    let encoded = state.encode().expect("state should encode");
    assert_eq!(
        service
            .verify_assertion(&credential, Some(&encoded))
            .await
            .unwrap_err(),
        PasskeyError::CeremonyTypeMismatch {
            expected: "webauthn.get",
        }
    );
}
