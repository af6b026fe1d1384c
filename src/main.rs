//! # ctxbench Firmware
//!
//! Runs the wake-latency benchmark and reports the per-path cycle costs.
//!
//! | Target | Clock | Report |
//! |--------|-------|--------|
//! | Cortex-M4 (`thumbv7em-none-eabihf`) | DWT CYCCNT | defmt over RTT |
//! | host | `std::time::Instant`, in nanoseconds | stdout |
//!
//! On the microcontroller every repetition runs with interrupts disabled,
//! then the core sleeps. The host build exists to exercise the scheduler
//! end to end; its numbers include OS noise.

#![cfg_attr(target_os = "none", no_std, no_main)]

#[cfg(all(target_arch = "arm", target_os = "none"))]
mod firmware {
    use cortex_m_rt::entry;
    #[cfg(feature = "defmt")]
    use defmt_rtt as _;
    use panic_halt as _;

    use ctxbench::arch::cortex_m4::{critical_section, DwtClock};
    use ctxbench::{BenchConfig, Benchmark};

    /// Firmware entry point. Calibrates, warms up, measures, reports and
    /// parks the core. Does not return.
    #[entry]
    fn main() -> ! {
        let mut cp = cortex_m::Peripherals::take().expect("peripherals already taken");
        let clock = DwtClock::enable(&mut cp.DCB, &mut cp.DWT);

        let mut bench = Benchmark::new(clock, BenchConfig::DEFAULT).expect("task table too small");

        bench.calibrate().expect("DWT cycle counter not running");
        critical_section(|_| bench.warm_up()).expect("warm-up failed");

        for _ in 0..bench.config().repetitions {
            critical_section(|_| bench.run_once()).expect("repetition failed");
        }
        assert!(bench.verify(), "unexpected final state");

        #[cfg(feature = "defmt")]
        {
            defmt::info!("overhead {} cycles", bench.kernel().probe().overhead());
            for (path, stats) in bench.costs().iter() {
                defmt::info!(
                    "{=str}: last {} min {} max {} mean {}",
                    path.name(),
                    stats.last,
                    stats.min,
                    stats.max,
                    stats.mean()
                );
            }
        }

        loop {
            cortex_m::asm::wfi();
        }
    }
}

#[cfg(not(target_os = "none"))]
fn main() -> std::process::ExitCode {
    use std::process::ExitCode;
    use std::time::Instant;

    use ctxbench::{BenchConfig, Benchmark, CycleClock, Cycles, Error};

    /// Nanoseconds since construction, truncated to the counter width.
    struct HostClock(Instant);

    impl CycleClock for HostClock {
        fn read_cycle_counter(&self) -> Cycles {
            self.0.elapsed().as_nanos() as Cycles
        }
    }

    let config = BenchConfig {
        repetitions: 1000,
        warmup_rounds: 10,
        ..BenchConfig::DEFAULT
    };

    let run = || -> Result<Benchmark<HostClock>, Error> {
        let mut bench = Benchmark::new(HostClock(Instant::now()), config)?;
        match bench.calibrate() {
            Ok(_) => {}
            // Coarse host clocks can return the same value twice in a row.
            Err(Error::ClockFault) => eprintln!("warning: clock too coarse, no overhead correction"),
            Err(e) => return Err(e),
        }
        bench.warm_up()?;
        bench.run(bench.config().repetitions)?;
        Ok(bench)
    };

    let bench = match run() {
        Ok(bench) => bench,
        Err(e) => {
            eprintln!("benchmark failed: {e}");
            return ExitCode::FAILURE;
        }
    };
    if !bench.verify() {
        eprintln!("unexpected final state: {:?}", bench.snapshot());
        return ExitCode::FAILURE;
    }

    println!(
        "{} repetitions, overhead {} ns",
        bench.config().repetitions,
        bench.kernel().probe().overhead()
    );
    println!("{:<16} {:>8} {:>8} {:>8} {:>8}", "path", "last", "min", "max", "mean");
    for (path, stats) in bench.costs().iter() {
        println!(
            "{:<16} {:>8} {:>8} {:>8} {:>8}",
            path.name(),
            stats.last,
            stats.min,
            stats.max,
            stats.mean().unwrap_or(0)
        );
    }
    ExitCode::SUCCESS
}
