use crate::initialization::LasSystem;
use crate::las::kernel::LasciResult;
use crate::utils::Timer;
use log::{debug, info, warn};
use ndarray::ArrayView1;

pub fn print_las_init(system: &LasSystem) {
    info!("{:^80}", "");
    info!("{: ^80}", "LAS wave function");
    info!("{:-^80}", "");
    info!("{: <25} {}", "core orbitals:", system.n_core);
    info!("{: <25} {}", "active orbitals:", system.n_cas);
    info!(
        "{: <25} {}",
        "external orbitals:",
        system.n_mo - system.n_occ()
    );
    info!("{: <25} {}", "density fitting:", system.df.is_some());
    info!("{:^80}", "");
    info!(
        "{: <8} {: >10} {: >12} {: >8} {: >8}",
        "Frag.", "Orbitals", "Electrons", "2S+1", "Irrep"
    );
    info!("{:-^50} ", "");
    for frag in system.fragments.iter() {
        info!(
            "{: >8} {: >10} {: >12} {: >8} {: >8}",
            frag.index + 1,
            frag.n_orbs,
            format!("({}, {})", frag.nelec.0, frag.nelec.1),
            frag.smult,
            frag.wfnsym
        );
    }
    info!("{:-^50} ", "");
    print_states(system);
}

pub fn print_states(system: &LasSystem) {
    info!("{:^80}", "");
    info!("{: <25} {}", "number of states:", system.nroots());
    info!(
        "{: <8} {: >8} {: >8} {: >8} {: >8} {: >8} {: >8}",
        "State", "Weight", "Frag.", "Charge", "2Ms", "2S+1", "Irrep"
    );
    info!("{:-^62} ", "");
    for (root, (w, row)) in system
        .weights()
        .iter()
        .zip(system.states.table.iter())
        .enumerate()
    {
        for (frag, qn) in row.iter().enumerate() {
            if frag == 0 {
                info!(
                    "{: >8} {: >8.4} {: >8} {: >8} {: >8} {: >8} {: >8}",
                    root + 1,
                    w,
                    frag + 1,
                    qn.charge,
                    qn.spin,
                    qn.smult,
                    qn.wfnsym
                );
            } else {
                info!(
                    "{: >8} {: >8} {: >8} {: >8} {: >8} {: >8} {: >8}",
                    "",
                    "",
                    frag + 1,
                    qn.charge,
                    qn.spin,
                    qn.smult,
                    qn.wfnsym
                );
            }
        }
    }
    info!("{:-^62} ", "");
}

pub fn print_lasci_state(root: usize, converged: bool, n_iter: usize, e_cas: f64) {
    if converged {
        debug!(
            "state {: >4} converged after {: >4} sweeps, E(cas) = {:>18.12}",
            root + 1,
            n_iter,
            e_cas
        );
    } else {
        warn!("State {} LASCI not converged!", root + 1);
    }
}

pub fn print_lasci_end(timer: &Timer, result: &LasciResult, weights: &[f64]) {
    info!("{:^80}", "");
    info!("{: ^80}", "LASCI results");
    info!("{:-^80}", "");
    info!(
        "{: <8} {: >8} {: >22} {: >22} {: >10}",
        "State", "Weight", "E(cas)/Hartree", "E(total)/Hartree", "Converged"
    );
    info!("{:-^74} ", "");
    for (root, w) in weights.iter().enumerate() {
        info!(
            "{: >8} {: >8.4} {: >22.14} {: >22.14} {: >10}",
            root + 1,
            w,
            result.e_cas[root],
            result.e_states[root],
            result.state_converged[root]
        );
    }
    info!("{:-^74} ", "");
    info!("{: <25} {:>24.14} Hartree", "state-averaged energy:", result.e_tot);
    info!("{:-<80} ", "");
    info!("{}", timer);
}

pub fn print_lasscf_init(max_cycle: usize, conv_tol_grad: f64) {
    info!("{:^80}", "");
    info!("{: ^80}", "LASSCF orbital optimization");
    info!("{:-^80}", "");
    info!("{: <25} {}", "max. iterations:", max_cycle);
    info!("{: <25} {:.2e}", "gradient threshold:", conv_tol_grad);
    info!("{:^80}", "");
    info!(
        "{: <45} ",
        "Macro iterations: all quantities are in atomic units"
    );
    info!("{:-^75} ", "");
    info!(
        "{: <5} {: >20} {: >14} {: >14} {: >14}",
        "Iter.", "Energy", "Energy diff.", "|g_orb|", "step scale"
    );
    info!("{:-^75} ", "");
}

pub fn print_macro_iteration(iter: usize, energy: f64, de: f64, norm_gorb: f64, scale: f64) {
    info!(
        "{: >5} {:>20.12} {:>14.6e} {:>14.6e} {:>14.4e}",
        iter,
        energy,
        de,
        norm_gorb,
        scale
    );
}

pub fn print_lasscf_end(timer: &Timer, converged: bool, e_tot: f64, n_iter: usize) {
    info!("{:-^75} ", "");
    if converged {
        info!("{: ^75}", format!("LASSCF converged in {} iterations", n_iter));
    } else {
        warn!("{: ^75}", format!("LASSCF not converged after {} iterations", n_iter));
    }
    info!("{:^80} ", "");
    info!("{: <25} {:>24.14} Hartree", "state-averaged energy:", e_tot);
    info!("{:-<80} ", "");
    info!("{}", timer);
}

pub fn print_orbital_information(orbe: ArrayView1<f64>, occ: ArrayView1<f64>) {
    info!("{:^80} ", "");
    info!(
        "{:^8} {:^6} {:>18.14} | {:^8} {:^6} {:>18.14}",
        "Orb.", "Occ.", "Energy/Hartree", "Orb.", "Occ.", "Energy/Hartree"
    );
    info!("{:-^71} ", "");
    let n_orbs: usize = orbe.len();
    for i in (0..n_orbs).step_by(2) {
        if i + 1 < n_orbs {
            info!(
                "MO:{:>5} {:>6.3} {:>18.14} | MO:{:>5} {:>6.3} {:>18.14}",
                i + 1,
                occ[i],
                orbe[i],
                i + 2,
                occ[i + 1],
                orbe[i + 1]
            );
        } else {
            info!("MO:{:>5} {:>6.3} {:>18.14} |", i + 1, occ[i], orbe[i]);
        }
    }
    info!("{:-^71} ", "");
}
