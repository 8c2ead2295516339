use cardex::core::types::{CardLevel, CardRecord, FilterFacets};
use cardex::index::inverted::SearchIndex;
use cardex::query::filter::filter_by_attributes;
use cardex::query::spec::{FilterSelection, QuerySpec};
use criterion::{Criterion, black_box, criterion_group, criterion_main};
use rand::Rng;

fn create_test_card(id: u64) -> CardRecord {
    let mut rng = rand::thread_rng();
    let names = ["Brave Sword", "Shield Bearer", "魔法少女リリ", "剣士アレン", "Storm Caller"];
    let effects = [
        "When played, draw a card.",
        "このカードが登場した時、1枚引く。",
        "Choose one of your characters, it gains power until end of turn.",
    ];

    CardRecord {
        id: format!("TST/S{:02}-{:03}C", id % 50, id),
        base_id: format!("TST/S{:02}-{:03}", id % 50, id),
        name: names[rng.gen_range(0..names.len())].to_string(),
        effect: effects[rng.gen_range(0..effects.len())].to_string(),
        card_type: ["Character", "Event", "Climax"][rng.gen_range(0..3)].to_string(),
        color: ["Red", "Blue", "Green", "Yellow"][rng.gen_range(0..4)].to_string(),
        level: CardLevel::Rank(rng.gen_range(0..4)),
        cost: rng.gen_range(0..10),
        power: rng.gen_range(0..12) * 1000,
        rarity: ["C", "U", "R", "RR", "SR"][rng.gen_range(0..5)].to_string(),
        trait_tags: vec![format!("trait_{}", id % 10)],
        product_name: format!("Product {}", id % 5),
        card_id_prefix: "TST".to_string(),
        link: vec![],
    }
}

fn bench_keyword_search(c: &mut Criterion) {
    let cards: Vec<CardRecord> = (0..10_000).map(create_test_card).collect();
    let index = SearchIndex::build(&cards, 1, 4).unwrap();

    let mut group = c.benchmark_group("keyword_search");

    group.bench_function("exact_latin", |b| {
        b.iter(|| index.search(black_box("sword")));
    });

    group.bench_function("fuzzy_latin_typo", |b| {
        b.iter(|| index.search(black_box("swrod")));
    });

    group.bench_function("cjk_bigram", |b| {
        b.iter(|| index.search(black_box("魔法")));
    });

    group.bench_function("multi_token", |b| {
        b.iter(|| index.search(black_box("brave sword")));
    });

    group.finish();
}

fn bench_attribute_filter(c: &mut Criterion) {
    let cards: Vec<CardRecord> = (0..10_000).map(create_test_card).collect();
    let facets = FilterFacets::derive(&cards);

    let mut selection = FilterSelection::reset_to(&facets);
    selection.card_types = vec!["Character".to_string()];
    selection.colors = vec!["Red".to_string(), "Blue".to_string()];
    selection.cost_range = (1, 5);
    let narrow = QuerySpec::build(&selection, &facets).unwrap();

    let mut unique = FilterSelection::reset_to(&facets);
    unique.unique_only = true;
    let unique = QuerySpec::build(&unique, &facets).unwrap();

    let mut group = c.benchmark_group("attribute_filter");

    group.bench_function("compound_predicates", |b| {
        b.iter(|| filter_by_attributes(black_box(cards.iter()), &narrow));
    });

    group.bench_function("unique_dedup", |b| {
        b.iter(|| filter_by_attributes(black_box(cards.iter()), &unique));
    });

    group.finish();
}

criterion_group!(benches, bench_keyword_search, bench_attribute_filter);
criterion_main!(benches);
