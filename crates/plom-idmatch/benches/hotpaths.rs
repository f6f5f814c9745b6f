use criterion::{black_box, criterion_group, criterion_main, Criterion};
use plom_idmatch::{
    build_cost_matrix, predict_greedy, predict_optimal, solve_optimal_assignment, DMatrix,
    DigitProbs, ProbabilityTable, StudentId,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const ID_LEN: usize = 8;

fn make_ids(n: usize, rng: &mut StdRng) -> Vec<StudentId> {
    let mut ids = Vec::with_capacity(n);
    while ids.len() < n {
        let s: String = (0..ID_LEN)
            .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
            .collect();
        let id = StudentId::new(s).expect("digits only");
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    ids
}

/// Noisy reader output for each paper, peaked on a shuffled roster ID.
fn make_fixture(n: usize, seed: u64) -> (Vec<u32>, Vec<StudentId>, ProbabilityTable) {
    let mut rng = StdRng::seed_from_u64(seed);
    let ids = make_ids(n, &mut rng);
    let papers: Vec<u32> = (1..=n as u32).collect();

    let mut table = ProbabilityTable::new();
    for (&paper, id) in papers.iter().zip(ids.iter().rev()) {
        let rows = id
            .digits()
            .map(|d| {
                let mut row: Vec<f64> = (0..10).map(|_| rng.gen_range(0.0..0.2)).collect();
                row[d] += rng.gen_range(0.3..0.9);
                let total: f64 = row.iter().sum();
                row.iter().map(|p| p / total).collect()
            })
            .collect();
        let probs = DigitProbs::from_rows(rows).expect("generated rows are valid");
        table.insert(paper, probs).expect("consistent digit count");
    }
    (papers, ids, table)
}

fn make_random_matrix(rows: usize, cols: usize, seed: u64) -> DMatrix<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    DMatrix::from_fn(rows, cols, |_, _| rng.gen_range(0.0..50.0))
}

fn bench_cost_matrix(c: &mut Criterion) {
    let (papers, ids, table) = make_fixture(200, 7);

    c.bench_function("cost_matrix_200x200", |b| {
        b.iter(|| {
            let m = build_cost_matrix(black_box(&papers), black_box(&ids), black_box(&table))
                .expect("fixture is consistent");
            black_box(m.nrows())
        })
    });
}

fn bench_hungarian(c: &mut Criterion) {
    let square = make_random_matrix(200, 200, 11);
    let wide = make_random_matrix(100, 400, 13);

    c.bench_function("hungarian_200x200", |b| {
        b.iter(|| {
            let pairs = solve_optimal_assignment(black_box(&square)).expect("finite costs");
            black_box(pairs.len())
        })
    });

    c.bench_function("hungarian_100x400", |b| {
        b.iter(|| {
            let pairs = solve_optimal_assignment(black_box(&wide)).expect("finite costs");
            black_box(pairs.len())
        })
    });
}

fn bench_predictors(c: &mut Criterion) {
    let (papers, ids, table) = make_fixture(200, 23);

    c.bench_function("predict_greedy_200", |b| {
        b.iter(|| {
            let preds = predict_greedy(black_box(&ids), black_box(&table)).expect("consistent");
            black_box(preds.len())
        })
    });

    c.bench_function("predict_optimal_200", |b| {
        b.iter(|| {
            let preds = predict_optimal(black_box(&papers), black_box(&ids), black_box(&table))
                .expect("consistent");
            black_box(preds.len())
        })
    });
}

criterion_group!(hotpaths, bench_cost_matrix, bench_hungarian, bench_predictors);
criterion_main!(hotpaths);
