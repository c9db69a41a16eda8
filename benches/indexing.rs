use criterion::{Criterion, black_box, criterion_group, criterion_main};
use polygraph::indexer::plugin::{LanguagePlugin, ParseContext};
use polygraph::indexer::typescript::TypescriptPlugin;
use polygraph::scip;

fn synthetic_ts_module(classes: usize) -> String {
    let mut src = String::from("import { api } from './api';\n\n");
    for i in 0..classes {
        src.push_str(&format!(
            "export class Service{i} {{\n  private cache: Map<string, number> = new Map();\n\n  async load(id: string): Promise<number> {{\n    if (this.cache.has(id)) {{\n      return this.cache.get(id)!;\n    }}\n    const value = await api(id);\n    this.cache.set(id, value);\n    return value;\n  }}\n}}\n\n"
        ));
    }
    src
}

fn bench_fallback_parse(c: &mut Criterion) {
    let plugin = TypescriptPlugin::typescript();
    let source = synthetic_ts_module(100);
    c.bench_function("typescript_fallback_parse_100_classes", |b| {
        b.iter(|| {
            let parsed = plugin.parse_file(&ParseContext {
                repo: "bench",
                rel_path: "src/services.ts",
                source: black_box(&source),
            });
            black_box(parsed.entities.len())
        })
    });
}

fn bench_decode(c: &mut Criterion) {
    // Encode a synthetic artifact once; decode per iteration.
    let mut buf = Vec::new();
    for doc in 0..50 {
        let mut document = Vec::new();
        let path = format!("src/mod{doc}.ts");
        field(1, path.as_bytes(), &mut document);
        for sym in 0..20 {
            let mut occ = Vec::new();
            let mut range = Vec::new();
            varint(sym * 10, &mut range);
            varint(0, &mut range);
            varint(8, &mut range);
            field(1, &range, &mut occ);
            let symbol = format!("x . . . mod{doc}/fn{sym}()");
            field(2, symbol.as_bytes(), &mut occ);
            occ.push(3 << 3);
            occ.push(1);
            field(2, &occ, &mut document);
        }
        field(2, &document, &mut buf);
    }
    c.bench_function("decode_artifact_1000_symbols", |b| {
        b.iter(|| black_box(scip::decode_index(black_box(&buf), "bench", "")).entities.len())
    });
}

fn varint(mut value: u64, out: &mut Vec<u8>) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            break;
        }
        out.push(byte | 0x80);
    }
}

fn field(num: u64, payload: &[u8], out: &mut Vec<u8>) {
    varint((num << 3) | 2, out);
    varint(payload.len() as u64, out);
    out.extend_from_slice(payload);
}

criterion_group!(benches, bench_fallback_parse, bench_decode);
criterion_main!(benches);
