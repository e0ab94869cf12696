use vaultkeep::datasource::types::{InviteKey, PublicKey, Share, ShareKey, UserInvite};

use crate::helpers::TestContext;

fn share(id: &str, create_time: i64) -> Share {
    Share {
        share_id: id.to_string(),
        vault_id: format!("vault-{id}"),
        address_id: "address-1".into(),
        target_type: 1,
        target_id: format!("vault-{id}"),
        permission: 1,
        owner: false,
        shared: true,
        content: None,
        content_key_rotation: None,
        expire_time: None,
        create_time,
    }
}

fn share_key(share_id: &str, rotation: i64) -> ShareKey {
    ShareKey {
        share_id: share_id.to_string(),
        key_rotation: rotation,
        key: format!("encrypted-key-{rotation}"),
        user_key_id: "user-key".into(),
        create_time: rotation * 1_000,
    }
}

fn invite(token: &str, create_time: i64) -> UserInvite {
    UserInvite {
        invite_token: token.to_string(),
        inviter_email: "inviter@example.com".into(),
        invited_email: "invited@example.com".into(),
        target_type: 1,
        target_id: "vault-1".into(),
        remote_share_id: None,
        keys: vec![InviteKey {
            key: format!("{token}-key"),
            key_rotation: 1,
        }],
        create_time,
        from_new_user: false,
    }
}

#[tokio::test]
async fn shares_are_per_user() {
    let ctx = TestContext::new().await.with_users(2).await;
    let (u1, u2) = (ctx.user(0), ctx.user(1));
    let shares = ctx.store().shares();

    shares
        .upsert_shares(u1, &[share("newer", 20), share("older", 10)])
        .await
        .unwrap();
    shares.upsert_shares(u2, &[share("theirs", 5)]).await.unwrap();

    assert_eq!(
        shares.get_all_shares(u1).await.unwrap(),
        vec![share("older", 10), share("newer", 20)]
    );
    assert!(shares.get_share(u2, "older").await.unwrap().is_none());
    assert_eq!(
        shares.get_share(u2, "theirs").await.unwrap(),
        Some(share("theirs", 5))
    );

    shares.remove_share(u1, "older").await.unwrap();
    assert_eq!(shares.get_all_shares(u1).await.unwrap().len(), 1);
    shares.remove_all_shares(u1).await.unwrap();
    assert!(shares.get_all_shares(u1).await.unwrap().is_empty());
    assert_eq!(shares.get_all_shares(u2).await.unwrap().len(), 1);
}

#[tokio::test]
async fn share_event_ids_per_share() {
    let ctx = TestContext::new().await.with_users(1).await;
    let user = ctx.user(0);
    let event_ids = ctx.store().share_event_ids();

    event_ids
        .upsert_last_event_id(user, "s1", "event-a")
        .await
        .unwrap();
    event_ids
        .upsert_last_event_id(user, "s2", "event-b")
        .await
        .unwrap();
    assert_eq!(
        event_ids.get_last_event_id(user, "s1").await.unwrap().as_deref(),
        Some("event-a")
    );

    event_ids.remove_all_event_ids(user).await.unwrap();
    assert!(event_ids.get_last_event_id(user, "s2").await.unwrap().is_none());
}

#[tokio::test]
async fn share_keys_sorted_by_rotation() {
    let ctx = TestContext::new().await;
    let share_keys = ctx.store().share_keys();

    share_keys
        .upsert_keys(&[share_key("s1", 3), share_key("s1", 1), share_key("s2", 1)])
        .await
        .unwrap();
    share_keys.upsert_keys(&[share_key("s1", 2)]).await.unwrap();

    let rotations: Vec<i64> = share_keys
        .get_keys("s1")
        .await
        .unwrap()
        .iter()
        .map(|k| k.key_rotation)
        .collect();
    assert_eq!(rotations, [1, 2, 3]);

    share_keys.remove_all_keys("s1").await.unwrap();
    assert!(share_keys.get_keys("s1").await.unwrap().is_empty());
    assert_eq!(share_keys.get_keys("s2").await.unwrap(), vec![share_key("s2", 1)]);
}

#[tokio::test]
async fn invites_and_their_keys() {
    let ctx = TestContext::new().await.with_users(1).await;
    let user = ctx.user(0);
    let store = ctx.store();

    store
        .user_invites()
        .upsert_invites(user, &[invite("later", 20), invite("first", 10)])
        .await
        .unwrap();
    let tokens: Vec<String> = store
        .user_invites()
        .get_invites(user)
        .await
        .unwrap()
        .into_iter()
        .map(|i| i.invite_token)
        .collect();
    assert_eq!(tokens, ["first", "later"]);

    store.user_invites().remove_invite(user, "first").await.unwrap();
    assert_eq!(
        store.user_invites().get_invites(user).await.unwrap(),
        vec![invite("later", 20)]
    );
    store.user_invites().remove_all_invites(user).await.unwrap();
    assert!(store.user_invites().get_invites(user).await.unwrap().is_empty());

    let keys = vec![
        InviteKey {
            key: "k1".into(),
            key_rotation: 1,
        },
        InviteKey {
            key: "k2".into(),
            key_rotation: 2,
        },
    ];
    let invite_keys = store.invite_keys();
    assert!(invite_keys.get_invite_keys(user, "t1").await.unwrap().is_empty());
    invite_keys.upsert_invite_keys(user, "t1", &keys).await.unwrap();
    invite_keys
        .upsert_invite_keys(user, "t2", &keys[..1])
        .await
        .unwrap();
    assert_eq!(invite_keys.get_invite_keys(user, "t1").await.unwrap(), keys);

    invite_keys.remove_invite_keys(user, "t1").await.unwrap();
    assert!(invite_keys.get_invite_keys(user, "t1").await.unwrap().is_empty());
    invite_keys.remove_all_invite_keys(user).await.unwrap();
    assert!(invite_keys.get_invite_keys(user, "t2").await.unwrap().is_empty());
}

#[tokio::test]
async fn public_keys_replace_per_email() {
    let ctx = TestContext::new().await;
    let public_keys = ctx.store().public_keys();
    let key = |value: &str| PublicKey {
        value: value.to_string(),
    };

    assert!(
        public_keys
            .get_public_keys("a@example.com")
            .await
            .unwrap()
            .is_empty()
    );
    public_keys
        .upsert_public_keys("a@example.com", &[key("old-1"), key("old-2")])
        .await
        .unwrap();
    public_keys
        .upsert_public_keys("a@example.com", &[key("new")])
        .await
        .unwrap();
    assert_eq!(
        public_keys.get_public_keys("a@example.com").await.unwrap(),
        vec![key("new")]
    );

    public_keys.remove_public_keys("a@example.com").await.unwrap();
    assert!(
        public_keys
            .get_public_keys("a@example.com")
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn spotlight_selection_is_replaced() {
    let ctx = TestContext::new().await.with_users(1).await;
    let user = ctx.user(0);
    let spotlight = ctx.store().spotlight_vaults();

    assert!(spotlight.get_ids(user).await.unwrap().is_empty());
    spotlight
        .set_ids(user, &["s1".to_string(), "s2".to_string()])
        .await
        .unwrap();
    spotlight.set_ids(user, &["s3".to_string()]).await.unwrap();
    assert_eq!(spotlight.get_ids(user).await.unwrap(), ["s3"]);

    spotlight.remove_all(user).await.unwrap();
    assert!(spotlight.get_ids(user).await.unwrap().is_empty());
}

#[tokio::test]
async fn removing_absent_rows_is_not_an_error() {
    let ctx = TestContext::new().await.with_users(1).await;
    let user = ctx.user(0);
    let store = ctx.store();
    store
        .shares()
        .upsert_shares(user, &[share("kept", 1)])
        .await
        .unwrap();

    store.shares().remove_share(user, "missing").await.unwrap();
    store
        .invite_keys()
        .remove_invite_keys(user, "missing-token")
        .await
        .unwrap();
    store.spotlight_vaults().remove_all(user).await.unwrap();

    // No key is needed for users that never stored anything
    store.shares().remove_share("stranger", "s1").await.unwrap();
    store.shares().remove_all_shares("stranger").await.unwrap();
    store
        .invite_keys()
        .remove_invite_keys("stranger", "token")
        .await
        .unwrap();
    store
        .invite_keys()
        .remove_all_invite_keys("stranger")
        .await
        .unwrap();
    store.spotlight_vaults().remove_all("stranger").await.unwrap();

    assert_eq!(
        store.shares().get_all_shares(user).await.unwrap(),
        vec![share("kept", 1)]
    );
}
