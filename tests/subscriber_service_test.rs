use outage_bot::repository::table::Table;
use outage_bot::service::subscriber_service::RegisterResult;
use outage_bot::service::subscriber_service::SubscriberService;
use outage_bot::util::display_offset;

mod common;

macro_rules! service_test {
    ($name:ident, |$db:ident, $service:ident| $body:block) => {
        #[tokio::test]
        async fn $name() {
            let ($db, db_path) = common::setup_db().await;
            let $service = SubscriberService::new($db.clone(), display_offset(4));

            $body

            common::teardown_db(db_path).await;
        }
    };
}

service_test!(test_register_twice_keeps_one_row, |db, service| {
    let first = service.register(7, Some("Ann"), None).await.unwrap();
    assert!(first.is_created());

    let second = service.register(7, Some("Changed"), Some(3)).await.unwrap();
    assert!(matches!(second, RegisterResult::AlreadyRegistered { .. }));
    assert_eq!(second.subscriber().name.as_deref(), Some("Ann"));
    assert_eq!(second.subscriber().referrer_id, None);

    assert_eq!(db.subscriber.select_all().await.unwrap().len(), 1);
});

service_test!(test_self_referral_is_dropped, |_db, service| {
    let result = service.register(5, None, Some(5)).await.unwrap();
    assert_eq!(result.subscriber().referrer_id, None);
    assert_eq!(service.referral_count(5).await.unwrap(), 0);
});

service_test!(test_referral_scenario, |_db, service| {
    // B's referrer is A
    service.register(100, Some("A"), None).await.unwrap();
    service.register(200, Some("B"), Some(100)).await.unwrap();

    assert_eq!(service.referral_count(100).await.unwrap(), 1);
    let top = service.top_referrers(1).await.unwrap();
    assert_eq!(top.len(), 1);
    assert_eq!(top[0].id, 100);
    assert_eq!(top[0].count, 1);

    assert_eq!(service.referral_rank(100).await.unwrap(), Some(1));
    assert_eq!(service.referral_rank(200).await.unwrap(), None);
});

service_test!(test_referrer_may_be_unregistered, |_db, service| {
    service.register(1, None, Some(999)).await.unwrap();
    let top = service.top_referrers(10).await.unwrap();
    assert_eq!(top[0].id, 999);
    assert_eq!(top[0].display_name(), "id:999");
});

service_test!(test_refresh_name_only_when_changed, |_db, service| {
    let mut sub = service
        .register(1, Some("Old"), None)
        .await
        .unwrap()
        .subscriber()
        .clone();

    assert!(!service.refresh_name(&mut sub, Some("Old")).await.unwrap());
    assert!(service.refresh_name(&mut sub, Some("New")).await.unwrap());
    assert_eq!(sub.name.as_deref(), Some("New"));

    let stored = service.get(1).await.unwrap().unwrap();
    assert_eq!(stored.name.as_deref(), Some("New"));
});

service_test!(test_stats_and_active_list, |_db, service| {
    service.register(1, None, None).await.unwrap();
    service.register(2, None, None).await.unwrap();
    service.register(3, None, None).await.unwrap();
    assert!(service.mark_blocked(2).await.unwrap());

    let stats = service.stats().await.unwrap();
    assert_eq!(stats.total, 3);
    assert_eq!(stats.blocked, 1);
    assert_eq!(stats.new_today, 3);
    assert_eq!(stats.new_this_week, 3);
    assert_eq!(stats.new_this_month, 3);

    assert_eq!(service.list_active().await.unwrap(), vec![1, 3]);
});
