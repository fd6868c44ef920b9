use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use gbemu::Emulator;

/// A minimal, valid, MBC-less 32KiB ROM: a header just complete enough to
/// pass cartridge-load validation, with an infinite `JR -2` loop at 0x0100
/// so the CPU always has something to execute.
fn make_rom() -> Vec<u8> {
    let mut rom = vec![0u8; 32 * 1024];
    rom[0x0100] = 0x18; // JR
    rom[0x0101] = 0xFE; // -2
    rom[0x0147] = 0x00; // cartridge type: ROM only
    rom[0x0148] = 0x00; // rom size code: 32KiB
    rom[0x0149] = 0x00; // ram size code: none
    rom
}

fn bench_single_step(c: &mut Criterion) {
    let rom = make_rom();

    c.bench_function("emulator_step_single", |b| {
        b.iter(|| {
            let mut emu = Emulator::from_rom(&rom).unwrap();
            black_box(emu.step());
        });
    });
}

fn bench_many_steps(c: &mut Criterion) {
    let rom = make_rom();
    let mut group = c.benchmark_group("emulator_step_many");

    for step_count in [100, 10_000, 1_000_000].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(step_count),
            step_count,
            |b, &count| {
                b.iter(|| {
                    let mut emu = Emulator::from_rom(&rom).unwrap();
                    for _ in 0..count {
                        emu.step();
                    }
                    black_box(emu.tcycles());
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_single_step, bench_many_steps);
criterion_main!(benches);
