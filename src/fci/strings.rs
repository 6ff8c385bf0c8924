use hashbrown::HashMap;

/// Largest number of orbitals a string of one u64 can describe.
pub const MAX_STRING_ORBITALS: usize = 63;

/// Number of ways to distribute `nelec` electrons of one spin over `norb` orbitals.
pub fn num_strings(norb: usize, nelec: usize) -> usize {
    if nelec > norb {
        return 0;
    }
    let k: usize = nelec.min(norb - nelec);
    (0..k).fold(1, |acc, i| acc * (norb - i) / (i + 1))
}

/// Occupation strings as bit masks in ascending order.
pub fn make_strings(norb: usize, nelec: usize) -> Vec<u64> {
    (0u64..(1u64 << norb))
        .filter(|string| string.count_ones() as usize == nelec)
        .collect()
}

/// Position of every string in the ordered list.
pub fn string_addresses(strings: &[u64]) -> HashMap<u64, usize> {
    strings
        .iter()
        .enumerate()
        .map(|(address, string)| (*string, address))
        .collect()
}

/// Occupied orbitals of a string in ascending order.
pub fn occupied_orbitals(string: u64) -> Vec<usize> {
    (0..=MAX_STRING_ORBITALS).filter(|p| string & (1u64 << p) != 0).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binomial_counts() {
        assert_eq!(num_strings(4, 2), 6);
        assert_eq!(num_strings(2, 0), 1);
        assert_eq!(num_strings(2, 3), 0);
        assert_eq!(make_strings(4, 2).len(), num_strings(4, 2));
    }

    #[test]
    fn strings_are_ordered() {
        assert_eq!(make_strings(3, 1), vec![0b001, 0b010, 0b100]);
        assert_eq!(make_strings(2, 0), vec![0]);
        assert_eq!(occupied_orbitals(0b1010), vec![1, 3]);
    }
}
