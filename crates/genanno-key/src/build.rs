// Copyright 2026 Forome
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Reference build tables: `hg19` and `hg38`.
//!
//! Each entry is `(name, start_address, bound_length, real_length)`, sorted by
//! `start_address`. `bound_length` is a power-of-two-aligned upper bound on
//! the addressable span reserved for the chromosome (safe for key
//! arithmetic); `real_length` is the biological sequence length.

/// One chromosome's slot in a reference build's address space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chrom {
    pub name: &'static str,
    pub start: u32,
    pub bound_length: u32,
    pub real_length: u32,
}

/// An immutable, sorted table of chromosomes for one named genome build.
#[derive(Debug, Clone, Copy)]
pub struct Build {
    pub name: &'static str,
    pub chroms: &'static [Chrom],
}

impl Build {
    /// Index of the chromosome named `name`, if present.
    pub fn find(&self, name: &str) -> Option<usize> {
        self.chroms.iter().position(|c| c.name == name)
    }

    /// Chromosome whose reserved range contains `addr`, located by the
    /// largest `start <= addr` (`partition_point(...) - 1`, i.e.
    /// `bisect_right(starts, addr) - 1`).
    pub fn locate(&self, addr: u32) -> Option<usize> {
        let idx = self.chroms.partition_point(|c| c.start <= addr);
        if idx == 0 {
            None
        } else {
            Some(idx - 1)
        }
    }

    /// Debug-time structural invariants: sorted, non-overlapping, fits in u32.
    #[cfg(debug_assertions)]
    fn check(&self) {
        let mut prev_end: u64 = 0;
        for (i, c) in self.chroms.iter().enumerate() {
            assert!(
                c.start as u64 >= prev_end,
                "build {:?}: chrom {} start {:#x} overlaps previous bound {:#x}",
                self.name,
                c.name,
                c.start,
                prev_end
            );
            assert!(
                c.real_length <= c.bound_length,
                "build {:?}: chrom {} real_length exceeds bound_length",
                self.name,
                c.name
            );
            prev_end = c.start as u64 + c.bound_length as u64;
            assert!(
                prev_end <= u32::MAX as u64 + 1,
                "build {:?}: chrom {} overflows u32 address space",
                self.name,
                c.name
            );
            let _ = i;
        }
    }
}

macro_rules! chrom {
    ($name:expr, $start:expr, $bound:expr, $real:expr) => {
        Chrom {
            name: $name,
            start: $start,
            bound_length: $bound,
            real_length: $real,
        }
    };
}

static HG38_CHROMS: &[Chrom] = &[
    chrom!("chrM", 0x0000_0400, 0x0030_0000, 16569),
    chrom!("chr1", 0x0030_0400, 0x0ED6_D000, 248956422),
    chrom!("chr2", 0x0F06_D400, 0x0E6F_A000, 242193529),
    chrom!("chr3", 0x1D76_7400, 0x0BD1_D000, 198295559),
    chrom!("chr4", 0x2948_4400, 0x0B56_8000, 190214555),
    chrom!("chr5", 0x349E_C400, 0x0AD2_1000, 181538259),
    chrom!("chr6", 0x3F70_D400, 0x0A2E_5000, 170805979),
    chrom!("chr7", 0x499F_2400, 0x097F_7000, 159345973),
    chrom!("chr8", 0x531E_9400, 0x08A6_B000, 145138636),
    chrom!("chr9", 0x5BC5_4400, 0x083F_C000, 138394717),
    chrom!("chr10", 0x6405_0400, 0x07F9_A000, 133797422),
    chrom!("chr11", 0x6BFE_A400, 0x080D_5000, 135086622),
    chrom!("chr12", 0x740B_F400, 0x07F1_A000, 133275309),
    chrom!("chr13", 0x7BFD_9400, 0x06D1_1000, 114364328),
    chrom!("chr14", 0x82CE_A400, 0x0661_6000, 107043718),
    chrom!("chr15", 0x8930_0400, 0x0614_5000, 101991189),
    chrom!("chr16", 0x8F44_5400, 0x0562_8000, 90338345),
    chrom!("chr17", 0x94A6_D400, 0x04F6_7000, 83257441),
    chrom!("chr18", 0x999D_4400, 0x04CA_7000, 80373285),
    chrom!("chr19", 0x9E67_B400, 0x037E_7000, 58617616),
    chrom!("chr20", 0xA1E6_2400, 0x03D7_6000, 64444167),
    chrom!("chr21", 0xA5BD_8400, 0x02C8_C000, 46709983),
    chrom!("chr22", 0xA886_4400, 0x0307_7000, 50818468),
    chrom!("chrX", 0xAB8D_B400, 0x094D_0000, 156040895),
    chrom!("chrY", 0xB4DA_B400, 0x0369_4000, 57227415),
];

static HG19_CHROMS: &[Chrom] = &[
    chrom!("chrM", 0x0000_0400, 0x0030_0000, 16571),
    chrom!("chr1", 0x0030_0400, 0x0EDB_5000, 249250621),
    chrom!("chr2", 0x0F0B_5400, 0x0E7E_F000, 243199373),
    chrom!("chr3", 0x1D8A_4400, 0x0BCD_A000, 198022430),
    chrom!("chr4", 0x2957_E400, 0x0B64_D000, 191154276),
    chrom!("chr5", 0x34BC_B400, 0x0AC8_9000, 180915260),
    chrom!("chr6", 0x3F85_4400, 0x0A33_1000, 171115067),
    chrom!("chr7", 0x49B8_5400, 0x097C_5000, 159138663),
    chrom!("chr8", 0x5334_A400, 0x08B9_6000, 146364022),
    chrom!("chr9", 0x5BEE_0400, 0x086A_C000, 141213431),
    chrom!("chr10", 0x6458_C400, 0x0814_2000, 135534747),
    chrom!("chr11", 0x6C6C_E400, 0x080C_1000, 135006516),
    chrom!("chr12", 0x7478_F400, 0x07FA_7000, 133851895),
    chrom!("chr13", 0x7C73_6400, 0x06DD_6000, 115169878),
    chrom!("chr14", 0x8350_C400, 0x0666_1000, 107349540),
    chrom!("chr15", 0x89B6_D400, 0x061C_9000, 102531392),
    chrom!("chr16", 0x8FD3_6400, 0x0562_C000, 90354753),
    chrom!("chr17", 0x9536_2400, 0x04D7_0000, 81195210),
    chrom!("chr18", 0x9A0D_2400, 0x04A7_6000, 78077248),
    chrom!("chr19", 0x9EB4_8400, 0x0386_4000, 59128983),
    chrom!("chr20", 0xA23A_C400, 0x03C1_C000, 63025520),
    chrom!("chr21", 0xA5FC_8400, 0x02DE_7000, 48129895),
    chrom!("chr22", 0xA8DA_F400, 0x030E_E000, 51304566),
    chrom!("chrX", 0xABE9_D400, 0x0941_4000, 155270560),
    chrom!("chrY", 0xB52B_1400, 0x038A_0000, 59373566),
];

pub static HG19: Build = Build {
    name: "hg19",
    chroms: HG19_CHROMS,
};

pub static HG38: Build = Build {
    name: "hg38",
    chroms: HG38_CHROMS,
};

/// Resolve a build by name (`"hg19"` or `"hg38"`).
pub fn by_name(name: &str) -> Option<&'static Build> {
    match name {
        "hg19" => Some(&HG19),
        "hg38" => Some(&HG38),
        _ => None,
    }
}

#[cfg(debug_assertions)]
pub(crate) fn check_all() {
    HG19.check();
    HG38.check();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_are_well_formed() {
        #[cfg(debug_assertions)]
        check_all();
    }

    #[test]
    fn hg38_worked_example_start() {
        let chr1 = HG38.chroms[HG38.find("chr1").unwrap()];
        assert_eq!(chr1.start, 0x0030_0400);
    }

    #[test]
    fn chrom_order_is_m_then_autosomes_then_xy() {
        let names: Vec<&str> = HG38.chroms.iter().map(|c| c.name).collect();
        assert_eq!(names[0], "chrM");
        assert_eq!(names[1], "chr1");
        assert_eq!(names[22], "chr22");
        assert_eq!(names[23], "chrX");
        assert_eq!(names[24], "chrY");
    }
}
