use std::fmt::{self, Display, Formatter};
use crate::stats::{percentage, LevelReport, StatsReport};

const HEADER_WIDTH: usize = 19;
const NUMBER_WIDTH: usize = 12;

/// A counter line: label, count, and the count as a share of `whole`
fn counted(f: &mut Formatter<'_>, prefix: &str, label: &str, count: u64, whole: u64) -> fmt::Result {
    writeln!(
        f,
        "{prefix}{label:<hw$}{count:>nw$}  {:>6.2}%",
        percentage(count, whole),
        hw = HEADER_WIDTH,
        nw = NUMBER_WIDTH
    )
}

fn plain(f: &mut Formatter<'_>, prefix: &str, label: &str, count: u64) -> fmt::Result {
    writeln!(f, "{prefix}{label:<hw$}{count:>nw$}", hw = HEADER_WIDTH, nw = NUMBER_WIDTH)
}

fn rate(f: &mut Formatter<'_>, prefix: &str, label: &str, rate: f64) -> fmt::Result {
    writeln!(f, "{prefix}{label:<hw$}{rate:>w$.2}%", hw = HEADER_WIDTH, w = NUMBER_WIDTH + 8)
}

/// Renders one level in the long per-cache layout, every line starting with `prefix`
pub fn write_level(f: &mut Formatter<'_>, prefix: &str, level: &LevelReport) -> fmt::Result {
    let c = &level.counters;
    let d = &level.derived;
    counted(f, prefix, "Load-Hits:", c.load_hits, d.load_accesses)?;
    counted(f, prefix, "Load-Misses:", c.load_misses, d.load_accesses)?;
    plain(f, prefix, "Load-Accesses:", d.load_accesses)?;
    rate(f, prefix, "Load-Miss-Rate:", d.load_miss_rate)?;
    writeln!(f, "{}", prefix.trim_end())?;
    counted(f, prefix, "Store-Hits:", c.store_hits, d.store_accesses)?;
    counted(f, prefix, "Store-Misses:", c.store_misses, d.store_accesses)?;
    plain(f, prefix, "Store-Accesses:", d.store_accesses)?;
    rate(f, prefix, "Store-Miss-Rate:", d.store_miss_rate)?;
    writeln!(f, "{}", prefix.trim_end())?;
    counted(f, prefix, "Total-Hits:", d.total_hits, d.total_accesses)?;
    counted(f, prefix, "Total-Misses:", d.total_misses, d.total_accesses)?;
    plain(f, prefix, "Total-Accesses:", d.total_accesses)?;
    rate(f, prefix, "Total-Miss-Rate:", d.miss_rate)?;
    writeln!(f, "{}", prefix.trim_end())
}

/// The text profile: one block per level, then the hierarchy totals
impl Display for StatsReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "PIN:MEMLATENCIES 1.0. 0x0")?;
        for (level, label) in self.levels.iter().zip(["L1", "L2"]) {
            writeln!(f, "#\n# {label} DCACHE stats\n#")?;
            write_level(f, "# ", level)?;
        }
        let c = &self.hierarchy.counters;
        let d = &self.hierarchy.derived;
        writeln!(f, "#\n# Total Stats\n#")?;
        counted(f, "# ", "Total-L-Hits:", c.load_hits, d.load_accesses)?;
        counted(f, "# ", "Total-L-Misses:", c.load_misses, d.load_accesses)?;
        counted(f, "# ", "Total-S-Hits:", c.store_hits, d.store_accesses)?;
        counted(f, "# ", "Total-S-Misses:", c.store_misses, d.store_accesses)?;
        counted(f, "# ", "Hits-Rate:", d.total_hits, d.total_accesses)?;
        counted(f, "# ", "Miss-Rate:", d.total_misses, d.total_accesses)?;
        plain(f, "# ", "Memory-Accesses:", self.main_memory_accesses)?;
        if self.prefetch_accesses > 0 {
            plain(f, "# ", "Prefetch-Lines:", self.prefetch_accesses)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::stats::{AccessCounters, LevelReport, StatsReport};

    fn report(levels: usize) -> StatsReport {
        let counters = AccessCounters { load_hits: 3, load_misses: 1, store_hits: 0, store_misses: 0 };
        StatsReport {
            levels: ["L1 Data Cache", "L2 Data Cache"].iter().take(levels).map(|name| LevelReport::new(*name, counters)).collect(),
            hierarchy: LevelReport::new("Total", counters),
            main_memory_accesses: 1,
            prefetch_accesses: 0,
        }
    }

    #[test]
    fn l2_section_only_when_configured() {
        let single = report(1).to_string();
        assert!(single.starts_with("PIN:MEMLATENCIES 1.0. 0x0\n"));
        assert!(single.contains("# L1 DCACHE stats"));
        assert!(!single.contains("# L2 DCACHE stats"));
        assert!(report(2).to_string().contains("# L2 DCACHE stats"));
    }

    #[test]
    fn totals_show_counts_and_percentages() {
        let text = report(1).to_string();
        let line = text.lines().find(|line| line.starts_with("# Total-L-Hits:")).unwrap();
        assert!(line.ends_with(" 75.00%"), "{line}");
        assert!(line.contains(" 3 "), "{line}");
        // No stores at all renders as 0 rather than NaN
        let stores = text.lines().find(|line| line.starts_with("# Total-S-Hits:")).unwrap();
        assert!(stores.ends_with("  0.00%"), "{stores}");
    }
}
