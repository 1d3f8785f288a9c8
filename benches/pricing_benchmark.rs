use chrono::{NaiveDate, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::{thread_rng, Rng};
use rental_booking::{
    AddOn, BookingPolicy, BookingSelection, BookingValidator, Hour, PriceCalculator, RateSheet,
};

// Random selections across the whole hour grid, some of them inverted or add-on heavy
fn random_selections(count: usize) -> Vec<BookingSelection> {
    let mut rng = thread_rng();
    let hours: Vec<Hour> = Hour::grid().collect();

    (0..count)
        .map(|_| {
            let start = hours[rng.gen_range(0..hours.len())];
            let end = hours[rng.gen_range(0..hours.len())];
            let mut selection =
                BookingSelection::new(NaiveDate::from_ymd_opt(2030, 7, 1), start, end);
            for add_on in AddOn::ALL {
                selection.add_ons.set(add_on, rng.gen_bool(0.5));
            }
            selection
        })
        .collect()
}

pub fn pricing_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("booking_pricing");
    let rates = RateSheet::new(23.75);
    let validator = BookingValidator::new(&BookingPolicy::default()).unwrap();
    let now = Utc.with_ymd_and_hms(2030, 6, 1, 0, 0, 0).unwrap();

    for count in [100usize, 1_000, 10_000].iter() {
        let selections = random_selections(*count);

        group.bench_with_input(BenchmarkId::new("price", count), &selections, |b, selections| {
            b.iter(|| {
                for selection in selections {
                    black_box(PriceCalculator::price(selection, &rates));
                }
            });
        });

        group.bench_with_input(
            BenchmarkId::new("price_and_validate", count),
            &selections,
            |b, selections| {
                b.iter(|| {
                    for selection in selections {
                        let priced = PriceCalculator::price(selection, &rates);
                        let _ = black_box(validator.validate(Some("car-1"), selection, &priced, now));
                    }
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, pricing_benchmark);
criterion_main!(benches);
