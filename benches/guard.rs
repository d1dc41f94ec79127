use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, SamplingMode, Throughput};

use taskdesk::auth_store::Session;
use taskdesk::guard::evaluate;
use taskdesk::identity::{normalize_role, CanonicalRole, User, UserProfile};
use taskdesk::routing::{route_entry, ROUTE_PERMISSIONS};

fn session_for(role: CanonicalRole) -> Session {
    let profile = UserProfile {
        id: "bench".into(),
        username: "bench".into(),
        role: role.as_str().into(),
        ..Default::default()
    };
    match User::try_from(profile) {
        Ok(u) => Session::signed_in(u),
        Err(_) => Session::default(),
    }
}

fn request_paths() -> Vec<String> {
    let mut paths: Vec<String> = ROUTE_PERMISSIONS.iter().map(|e| e.path.to_string()).collect();
    // deep links and unlisted pages exercise the prefix walk
    for e in ROUTE_PERMISSIONS {
        paths.push(format!("{}/42/detail", e.path));
    }
    paths.push("/nowhere/at/all".into());
    paths
}

fn bench_guard(c: &mut Criterion) {
    let paths = request_paths();
    let mut group = c.benchmark_group("guard_evaluate");
    group.sampling_mode(SamplingMode::Flat);
    group.throughput(Throughput::Elements(paths.len() as u64));

    for role in CanonicalRole::ALL {
        let session = session_for(role);
        group.bench_with_input(BenchmarkId::new("role", role.as_str()), &role, |b, _| {
            b.iter(|| {
                let mut rendered = 0usize;
                for p in &paths {
                    if evaluate(&session, p).renders_page() {
                        rendered += 1;
                    }
                }
                criterion::black_box(rendered);
            });
        });
    }
    group.finish();

    let tokens = ["Admin", " sep ", "nhanvien", "truongphong", "pmo", "auditor"];
    c.bench_function("normalize_role", |b| {
        b.iter(|| {
            let known = tokens.iter().filter(|t| normalize_role(t).is_ok()).count();
            criterion::black_box(known);
        });
    });

    c.bench_function("route_entry_deep_link", |b| {
        b.iter(|| criterion::black_box(route_entry("/tasks/approvals/17/history")));
    });
}

criterion_group!(benches, bench_guard);
criterion_main!(benches);
