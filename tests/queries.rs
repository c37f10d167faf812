//! Details and browse queries through the client.

mod support;

use support::{connect, stored, workshop_with, WAIT};
use workshop_rust::{
    collect_browse_pages, BrowseFilter, FindOrder, QueryOptions, QueryStatus, Request,
};

#[test]
fn details_query_round_trip() {
    let mut ten = stored(10, "Ten");
    ten.description = "d".repeat(400);
    ten.metadata = "v1".into();
    ten.key_value_tags = vec![("engine".into(), "2".into())];
    let mut client = connect(workshop_with(vec![ten, stored(20, "Twenty")]));

    let options = QueryOptions {
        long_description: true,
        metadata: true,
        key_value_tags: true,
        ..Default::default()
    };
    let slot = client.create_details_query(options, &[10, 20]);
    assert_eq!(client.query_status(slot), QueryStatus::Pending);
    assert!(client.wait_for_queries(&[slot], WAIT));

    assert_eq!(client.query_status(slot), QueryStatus::Completed);
    assert_eq!(client.query_results(slot).count, 2);
    assert_eq!(client.query_detail(slot, 0).id, 10);
    assert_eq!(client.query_detail(slot, 0).description.len(), 400);
    assert_eq!(client.query_detail(slot, 1).title, "Twenty");
    assert_eq!(client.query_metadata(slot, 0), "v1");
    assert_eq!(
        client.query_key_value_tags(slot, 0),
        &[("engine".to_string(), "2".to_string())]
    );
    assert!(client.query_options(slot).metadata);

    let details = client.finish_details_query(slot);
    assert_eq!(details.len(), 2);
    assert_eq!(details[1].metadata.as_deref(), Some(""));
    assert!(!client.is_query_valid(slot));
    assert_eq!(client.open_slots(), 0);
}

#[test]
fn descriptions_are_short_unless_requested() {
    let mut long = stored(10, "Long");
    long.description = "d".repeat(400);
    let mut client = connect(workshop_with(vec![long]));

    let slot = client.create_details_query(QueryOptions::default(), &[10]);
    assert!(client.wait_for_queries(&[slot], WAIT));
    assert_eq!(client.query_detail(slot, 0).description.len(), 255);
    client.finish_query(slot);
}

#[test]
fn search_text_is_sent_only_when_set() {
    let mut client = connect(workshop_with(vec![stored(1, "Castle"), stored(2, "Dungeon")]));

    let options = QueryOptions {
        search_text: Some(String::new()),
        ..Default::default()
    };
    let slot = client.create_browse_query(options, BrowseFilter::default());
    assert!(client.wait_for_queries(&[slot], WAIT));
    assert_eq!(client.finish_browse_query(slot), vec![1, 2]);

    let options = QueryOptions {
        search_text: Some("castle".into()),
        ..Default::default()
    };
    let slot = client.create_browse_query(options, BrowseFilter::default());
    assert!(client.wait_for_queries(&[slot], WAIT));
    assert_eq!(client.finish_browse_query(slot), vec![1]);

    let texts: Vec<Option<String>> = client
        .transport()
        .requests()
        .iter()
        .filter_map(|request| match request {
            Request::Query(query) => Some(query.search_text.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(texts, vec![None, Some("castle".to_string())]);
}

#[test]
fn browse_orders_and_filters_by_tags() {
    let mut items = Vec::new();
    for (id, votes, tags) in [(1, 3, vec!["Map"]), (2, 9, vec!["Map", "Music"]), (3, 5, vec!["Music"])] {
        let mut item = stored(id, &format!("item {}", id));
        item.votes_up = votes;
        item.tags = tags.into_iter().map(String::from).collect();
        items.push(item);
    }
    let mut client = connect(workshop_with(items));

    let filter = BrowseFilter {
        order: FindOrder::Votes,
        tags: vec!["Map".into()],
        ..Default::default()
    };
    let slot = client.create_browse_query(QueryOptions::default(), filter);
    assert!(client.wait_for_queries(&[slot], WAIT));
    assert_eq!(client.finish_browse_query(slot), vec![2, 1]);

    let filter = BrowseFilter {
        order: FindOrder::Date,
        tags: vec!["Map".into(), "Music".into()],
        match_any_tag: true,
        ..Default::default()
    };
    let slot = client.create_browse_query(QueryOptions::default(), filter);
    assert!(client.wait_for_queries(&[slot], WAIT));
    assert_eq!(client.finish_browse_query(slot), vec![3, 2, 1]);
}

#[test]
fn paging_stops_at_max_count_without_extra_pages() {
    let items = (1..=6).map(|id| stored(id, "item")).collect();
    let mut client = connect(workshop_with(items).with_page_size(3));

    let report = collect_browse_pages(
        &mut client,
        &QueryOptions::default(),
        &BrowseFilter::default(),
        Some(5),
        WAIT,
    )
    .unwrap();
    assert_eq!(report.ids, vec![1, 2, 3, 4, 5]);
    assert_eq!(report.pages_requested, 2);

    let pages: Vec<u32> = client
        .transport()
        .requests()
        .iter()
        .filter_map(|request| match request {
            Request::Query(query) => match &query.target {
                workshop_rust::QueryTarget::Browse(filter) => Some(filter.page),
                _ => None,
            },
            _ => None,
        })
        .collect();
    assert_eq!(pages, vec![1, 2]);
}

#[test]
fn paging_without_limit_reads_until_an_empty_page() {
    let items = (1..=6).map(|id| stored(id, "item")).collect();
    let mut client = connect(workshop_with(items).with_page_size(3));

    let report = collect_browse_pages(
        &mut client,
        &QueryOptions::default(),
        &BrowseFilter::default(),
        None,
        WAIT,
    )
    .unwrap();
    assert_eq!(report.ids.len(), 6);
    assert_eq!(report.pages_requested, 3);
}

#[test]
fn independent_queries_complete_together() {
    let mut client = connect(workshop_with(vec![stored(1, "One"), stored(2, "Two")]));
    let first = client.create_details_query(QueryOptions::default(), &[1]);
    let second = client.create_details_query(QueryOptions::default(), &[2]);
    assert_ne!(first, second);

    assert!(client.wait_for_queries(&[first, second], WAIT));
    assert_eq!(client.query_detail(first, 0).title, "One");
    assert_eq!(client.query_detail(second, 0).title, "Two");

    client.finish_query(first);
    let third = client.create_details_query(QueryOptions::default(), &[2]);
    assert_eq!(third, first);
}
