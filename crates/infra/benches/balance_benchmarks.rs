use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use acctparty_accounting::{
    Account, AccountId, AccountKind, Company, Currency, MoveLine, MoveLineId, Session,
};
use acctparty_core::{AggregateId, CompanyId, PartyId, UserId};
use acctparty_infra::{InMemoryLedger, PartyBalances};
use rust_decimal::Decimal;
use std::sync::Arc;

const LINES_PER_PARTY: usize = 4;

fn ledger_with_parties(count: usize) -> (Arc<InMemoryLedger>, CompanyId, Vec<PartyId>) {
    let ledger = Arc::new(InMemoryLedger::new());
    let company = CompanyId::new();
    let account = AccountId::new(AggregateId::new());
    ledger
        .insert_account(Account {
            id: account,
            company,
            kind: AccountKind::Receivable,
            active: true,
            party_required: true,
        })
        .unwrap();

    let parties: Vec<PartyId> = (0..count).map(|_| PartyId::new()).collect();
    for (i, party) in parties.iter().enumerate() {
        for j in 0..LINES_PER_PARTY {
            ledger
                .insert_line(MoveLine {
                    id: MoveLineId::new(AggregateId::new()),
                    account,
                    party: Some(*party),
                    debit: Decimal::new((i * 100 + j) as i64, 2),
                    credit: Decimal::ZERO,
                    maturity_date: None,
                    reconciliation: None,
                })
                .unwrap();
        }
    }
    (ledger, company, parties)
}

fn bench_batched_balance_read(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
    let mut group = c.benchmark_group("get_receivable_payable");

    for party_count in [100usize, 2_000] {
        let (ledger, company, parties) = ledger_with_parties(party_count);
        let session = Session::new(UserId::new(), Some(Company::new(company, Currency::with_cents("EUR"))));
        group.throughput(Throughput::Elements(party_count as u64));

        for in_max in [100usize, 1_000] {
            let service = PartyBalances::new(Arc::clone(&ledger)).with_in_max(in_max);
            group.bench_with_input(
                BenchmarkId::new(format!("in_max_{in_max}"), party_count),
                &parties,
                |b, parties| {
                    b.iter(|| {
                        let result = runtime
                            .block_on(service.get_receivable_payable(
                                &session,
                                black_box(parties),
                                &["receivable", "receivable_today"],
                            ))
                            .unwrap();
                        black_box(result)
                    })
                },
            );
        }
    }
    group.finish();
}

criterion_group!(benches, bench_batched_balance_read);
criterion_main!(benches);
