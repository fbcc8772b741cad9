use common::{Article, BillOfMaterials, BomLine, Price, ProductId};
use criterion::{Criterion, criterion_group, criterion_main};
use engine::{Inventory, RestockEntry, SaleEngine, StockSnapshot, compute_sellable_quantity};
use stock_store::{InMemoryArticleLedger, InMemoryProductCatalog, ProductCatalog};

fn wide_bom(lines: usize) -> BillOfMaterials {
    BillOfMaterials::new(
        (0..lines)
            .map(|i| BomLine::new(format!("art-{i}"), (i % 7 + 1) as u64))
            .collect(),
    )
    .unwrap()
}

fn snapshot(lines: usize, stock: u64) -> StockSnapshot {
    StockSnapshot::from_articles(
        (0..lines).map(|i| Article::new(format!("art-{i}"), format!("article {i}"), stock)),
    )
}

fn bench_sellable_quantity_small(c: &mut Criterion) {
    let bom = wide_bom(3);
    let stock = snapshot(3, 1_000);

    c.bench_function("availability/sellable_quantity_3_lines", |b| {
        b.iter(|| compute_sellable_quantity(&bom, &stock));
    });
}

fn bench_sellable_quantity_wide(c: &mut Criterion) {
    let bom = wide_bom(100);
    let stock = snapshot(100, 1_000);

    c.bench_function("availability/sellable_quantity_100_lines", |b| {
        b.iter(|| compute_sellable_quantity(&bom, &stock));
    });
}

/// Seeds a ledger deep enough that the benchmark never sells out.
async fn seed_sale(lines: usize) -> (SaleEngine<InMemoryArticleLedger, InMemoryProductCatalog>, ProductId) {
    let ledger = InMemoryArticleLedger::with_articles(
        (0..lines).map(|i| Article::new(format!("art-{i}"), format!("article {i}"), u64::MAX / 2)),
    );
    let catalog = InMemoryProductCatalog::new();
    let product = catalog
        .upsert_by_name("Bench", Price::from_cents(100), wide_bom(lines))
        .await
        .unwrap();
    (SaleEngine::new(ledger, catalog), product.id)
}

fn bench_sell_in_memory(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let (engine, product_id) = rt.block_on(seed_sale(3));

    c.bench_function("sale/sell_in_memory_3_lines", |b| {
        b.iter(|| {
            rt.block_on(async {
                engine.sell(&product_id).await.unwrap();
            });
        });
    });
}

fn bench_list_sellable(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let inventory = Inventory::new(InMemoryArticleLedger::new(), InMemoryProductCatalog::new());

    rt.block_on(async {
        inventory
            .restock(
                (0..50)
                    .map(|i| RestockEntry::new(format!("art-{i}"), format!("article {i}"), "1000"))
                    .collect(),
            )
            .await
            .unwrap();
        for p in 0..100 {
            let bom = BillOfMaterials::new(
                (0..5)
                    .map(|l| BomLine::new(format!("art-{}", (p + l * 7) % 50), (l + 1) as u64))
                    .collect(),
            )
            .unwrap();
            inventory
                .catalog()
                .upsert_by_name(&format!("product {p}"), Price::from_cents(500), bom)
                .await
                .unwrap();
        }
    });

    c.bench_function("inventory/list_sellable_100_products", |b| {
        b.iter(|| {
            rt.block_on(async {
                inventory.list_sellable().await.unwrap();
            });
        });
    });
}

criterion_group!(
    benches,
    bench_sellable_quantity_small,
    bench_sellable_quantity_wide,
    bench_sell_in_memory,
    bench_list_sellable,
);
criterion_main!(benches);
