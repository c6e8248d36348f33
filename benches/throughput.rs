use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use lenna::middleware::{from_fn, Next};
use lenna::router::RouteTrie;
use lenna::{Application, Method, Request, Response};

const ZOO_ROUTES: &[(&str, &str, &str)] = &[
    ("GET", "/", "root_handler"),
    ("GET", "/zoo/animals", "get_animals"),
    ("POST", "/zoo/animals", "create_animal"),
    ("GET", "/zoo/animals/:id", "get_animal"),
    ("PUT", "/zoo/animals/:id", "update_animal"),
    ("PATCH", "/zoo/animals/:id", "patch_animal"),
    ("DELETE", "/zoo/animals/:id", "delete_animal"),
    ("GET", "/zoo/animals/:id/toys/:toy_id", "animal_toy"),
    (
        "GET",
        "/zoo/:category/animals/:id/habitats/:habitat_id/sections/:section_id",
        "habitat_section",
    ),
    (
        "POST",
        "/inventory/:warehouse_id/feeds/:feed_id/items/:item_id/batches/:batch_id",
        "post_item_batch",
    ),
    ("GET", "/complex/:a/:b/:c/:d/:e/:f/:g/:h/:i", "complex_many_params"),
    ("HEAD", "/zoo/health", "health_check"),
    ("OPTIONS", "/zoo/health", "supported_ops"),
];

const TEST_PATHS: &[(&str, &str)] = &[
    ("GET", "/zoo/animals/123"),
    ("GET", "/zoo/animals/123/toys/456"),
    ("GET", "/zoo/cats/animals/123/habitats/88/sections/5"),
    ("POST", "/inventory/1/feeds/2/items/3/batches/4"),
    ("GET", "/complex/1/2/3/4/5/6/7/8/9"),
];

fn zoo_trie() -> RouteTrie<&'static str> {
    let mut trie = RouteTrie::new();
    for &(method, path, name) in ZOO_ROUTES {
        trie.add_route(method, path, name).unwrap();
    }
    trie.freeze();
    trie
}

fn bench_route_match(c: &mut Criterion) {
    let trie = zoo_trie();
    c.bench_function("route_match", |b| {
        b.iter(|| {
            for &(method, path) in TEST_PATHS {
                let res = trie.match_route(method, path);
                black_box(&res);
            }
        })
    });
}

fn bench_application_call(c: &mut Criterion) {
    let mut app = Application::new();
    for _ in 0..3 {
        app.use_middleware(from_fn(
            |req: &Request, res: &mut Response, next: Next<'_>| next.run(req, res),
        ));
    }
    for &(method, path, name) in ZOO_ROUTES {
        app.route(method, path, move |_req, res| {
            res.text(name);
            Ok(())
        })
        .unwrap();
    }
    app.freeze();

    c.bench_function("application_call", |b| {
        b.iter(|| {
            for &(method, path) in TEST_PATHS {
                let method: Method = method.parse().unwrap();
                let res = app.call(Request::new(method, path)).unwrap();
                black_box(&res);
            }
        })
    });
}

criterion_group!(benches, bench_route_match, bench_application_call);
criterion_main!(benches);
