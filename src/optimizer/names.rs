use rand::Rng;

/// Fresh-name generator for one decoration.
///
/// Hoisted parameters share one random 64-bit tag, loop sentinels another,
/// so the two families can never collide with each other or with any name
/// the user could plausibly have written.
pub struct FreshNames {
    param_prefix: String,
    flag_prefix: String,
    flag_count: usize,
}

impl FreshNames {
    pub fn new() -> Self {
        let mut rng = rand::thread_rng();
        let param_tag: u64 = rng.gen();
        let mut flag_tag: u64 = rng.gen();
        while flag_tag == param_tag {
            flag_tag = rng.gen();
        }

        FreshNames {
            param_prefix: format!("_tco_{:016x}_", param_tag),
            flag_prefix: format!("_tco_resume_{:016x}_", flag_tag),
            flag_count: 0,
        }
    }

    /// The hoisted local shadowing parameter `name`.
    pub fn param(&self, name: &str) -> String {
        format!("{}{}", self.param_prefix, name)
    }

    /// A fresh sentinel flag for the next loop encountered.
    pub fn next_flag(&mut self) -> String {
        let flag = format!("{}{}", self.flag_prefix, self.flag_count);
        self.flag_count += 1;
        flag
    }
}

impl Default for FreshNames {
    fn default() -> Self {
        Self::new()
    }
}
