//! Long short-term memory layer.
//!
//! Maintains hidden and cell state across successive forward calls on the
//! same sequence; call [`Layer::reset_state`] at a sequence boundary.
//! Forward computes the forget/input/candidate/output gates from the
//! concatenation `[h_prev, x]`, each with its own weight and bias buffer,
//! then `c = f (.) c_prev + i (.) g` and `h = o (.) tanh(c)`. Backward
//! computes per-gate local gradients from the cached gate activations and
//! distributes them to four independent weight/bias accumulators.
//!
//! Like [`super::Rnn`], the backward pass is a truncated single-step
//! gradient: no cell-state or hidden-state gradient is carried across time
//! steps.

use super::Layer;
use crate::checkpoint::{self, CheckpointReader};
use crate::init::Init;
use crate::mat::{self, Mat};
use crate::math;
use crate::optim::Optimizer;
use rand::rngs::StdRng;
use std::error::Error;
use std::io::Write;

struct LstmCache {
    cat: Mat,
    f: Mat,
    i: Mat,
    g: Mat,
    o: Mat,
    c_prev: Mat,
    c_new: Mat,
}

/// LSTM layer over row-vector samples.
pub struct Lstm {
    in_size: usize,
    hidden_size: usize,
    wf: Mat,
    wi: Mat,
    wc: Mat,
    wo: Mat,
    bf: Mat,
    bi: Mat,
    bc: Mat,
    bo: Mat,
    nabla_wf: Mat,
    nabla_wi: Mat,
    nabla_wc: Mat,
    nabla_wo: Mat,
    nabla_bf: Mat,
    nabla_bi: Mat,
    nabla_bc: Mat,
    nabla_bo: Mat,
    h: Mat,
    c: Mat,
    cache: Option<LstmCache>,
    init: Init,
}

impl Lstm {
    /// Builds an LSTM, Kaiming-initialized over the hidden size.
    pub fn new(in_size: usize, hidden_size: usize) -> Self {
        Self::with_init(in_size, hidden_size, Init::kaiming(hidden_size))
    }

    /// Builds an LSTM with an explicit initialization strategy.
    pub fn with_init(in_size: usize, hidden_size: usize, init: Init) -> Self {
        let gate_w = || Mat::zeros(in_size + hidden_size, hidden_size);
        let gate_b = || Mat::zeros(1, hidden_size);
        Self {
            in_size,
            hidden_size,
            wf: gate_w(),
            wi: gate_w(),
            wc: gate_w(),
            wo: gate_w(),
            bf: gate_b(),
            bi: gate_b(),
            bc: gate_b(),
            bo: gate_b(),
            nabla_wf: gate_w(),
            nabla_wi: gate_w(),
            nabla_wc: gate_w(),
            nabla_wo: gate_w(),
            nabla_bf: gate_b(),
            nabla_bi: gate_b(),
            nabla_bc: gate_b(),
            nabla_bo: gate_b(),
            h: Mat::zeros(1, hidden_size),
            c: Mat::zeros(1, hidden_size),
            cache: None,
            init,
        }
    }

    /// The current hidden state.
    pub fn hidden(&self) -> &Mat {
        &self.h
    }

    /// The current cell state.
    pub fn cell(&self) -> &Mat {
        &self.c
    }

    fn gate(cat: &Mat, w: &Mat, b: &Mat, act: fn(&mut Mat)) -> Mat {
        let mut z = cat.matmul(w);
        z.add_assign(b);
        act(&mut z);
        z
    }
}

impl Layer for Lstm {
    fn forward(&mut self, input: Mat) -> Mat {
        assert_eq!(
            input.cols(),
            self.in_size,
            "lstm input shape mismatch: expected 1x{}, got {}x{}",
            self.in_size,
            input.rows(),
            input.cols()
        );
        let cat = mat::concat(&self.h, &input);
        let f = Self::gate(&cat, &self.wf, &self.bf, math::sigmoid);
        let i = Self::gate(&cat, &self.wi, &self.bi, math::sigmoid);
        let g = Self::gate(&cat, &self.wc, &self.bc, math::tanh);
        let o = Self::gate(&cat, &self.wo, &self.bo, math::sigmoid);

        let c_prev = self.c.clone();
        let mut c_new = f.clone();
        c_new.hadamard_assign(&c_prev);
        let mut ig = i.clone();
        ig.hadamard_assign(&g);
        c_new.add_assign(&ig);

        let mut y = c_new.clone();
        math::tanh(&mut y);
        y.hadamard_assign(&o);

        self.c = c_new.clone();
        self.h = y.clone();
        self.cache = Some(LstmCache {
            cat,
            f,
            i,
            g,
            o,
            c_prev,
            c_new,
        });
        y
    }

    fn backward(&mut self, delta: Mat) -> Mat {
        let LstmCache {
            cat,
            f,
            i,
            g,
            o,
            c_prev,
            c_new,
        } = self
            .cache
            .take()
            .expect("lstm backward called without a matching forward");

        let mut tanh_c = c_new.clone();
        math::tanh(&mut tanh_c);

        // dL/dc through h = o (.) tanh(c).
        let mut dc = tanh_c.clone();
        math::tanh_grad_from_output(&mut dc);
        dc.hadamard_assign(&o);
        dc.hadamard_assign(&delta);

        // Per-gate pre-activation gradients from the cached activations.
        let mut dpre_o = delta.clone();
        dpre_o.hadamard_assign(&tanh_c);
        let mut o_grad = o;
        math::sigmoid_grad_from_output(&mut o_grad);
        dpre_o.hadamard_assign(&o_grad);

        let mut dpre_f = dc.clone();
        dpre_f.hadamard_assign(&c_prev);
        let mut f_grad = f;
        math::sigmoid_grad_from_output(&mut f_grad);
        dpre_f.hadamard_assign(&f_grad);

        let mut dpre_i = dc.clone();
        dpre_i.hadamard_assign(&g);
        let mut i_grad = i.clone();
        math::sigmoid_grad_from_output(&mut i_grad);
        dpre_i.hadamard_assign(&i_grad);

        let mut dpre_g = dc;
        dpre_g.hadamard_assign(&i);
        let mut g_grad = g;
        math::tanh_grad_from_output(&mut g_grad);
        dpre_g.hadamard_assign(&g_grad);

        let cat_t = cat.transpose();
        self.nabla_wf.add_assign(&cat_t.matmul(&dpre_f));
        self.nabla_wi.add_assign(&cat_t.matmul(&dpre_i));
        self.nabla_wc.add_assign(&cat_t.matmul(&dpre_g));
        self.nabla_wo.add_assign(&cat_t.matmul(&dpre_o));
        self.nabla_bf.add_assign(&dpre_f);
        self.nabla_bi.add_assign(&dpre_i);
        self.nabla_bc.add_assign(&dpre_g);
        self.nabla_bo.add_assign(&dpre_o);

        // Gradient through the concatenation; the x part is the tail.
        let mut dcat = dpre_f.matmul(&self.wf.transpose());
        dcat.add_assign(&dpre_i.matmul(&self.wi.transpose()));
        dcat.add_assign(&dpre_g.matmul(&self.wc.transpose()));
        dcat.add_assign(&dpre_o.matmul(&self.wo.transpose()));
        dcat.slice_cols(self.hidden_size, self.in_size)
    }

    fn randomize(&mut self, rng: &mut StdRng) {
        for w in [&mut self.wf, &mut self.wi, &mut self.wc, &mut self.wo] {
            w.randomize(&self.init, rng);
        }
        for b in [&mut self.bf, &mut self.bi, &mut self.bc, &mut self.bo] {
            b.randomize(&self.init, rng);
        }
    }

    fn apply_update(&mut self, optimizer: &dyn Optimizer, samples: usize) {
        optimizer.step(&mut self.wf, &self.nabla_wf, samples);
        optimizer.step(&mut self.wi, &self.nabla_wi, samples);
        optimizer.step(&mut self.wc, &self.nabla_wc, samples);
        optimizer.step(&mut self.wo, &self.nabla_wo, samples);
        optimizer.step(&mut self.bf, &self.nabla_bf, samples);
        optimizer.step(&mut self.bi, &self.nabla_bi, samples);
        optimizer.step(&mut self.bc, &self.nabla_bc, samples);
        optimizer.step(&mut self.bo, &self.nabla_bo, samples);
        for nabla in [
            &mut self.nabla_wf,
            &mut self.nabla_wi,
            &mut self.nabla_wc,
            &mut self.nabla_wo,
            &mut self.nabla_bf,
            &mut self.nabla_bi,
            &mut self.nabla_bc,
            &mut self.nabla_bo,
        ] {
            nabla.clear();
        }
    }

    fn save(&self, out: &mut dyn Write) -> std::io::Result<()> {
        for w in [&self.wf, &self.wi, &self.wc, &self.wo] {
            checkpoint::write_mat(out, w)?;
        }
        for b in [&self.bf, &self.bi, &self.bc, &self.bo] {
            checkpoint::write_mat(out, b)?;
        }
        Ok(())
    }

    fn load(&mut self, src: &mut CheckpointReader<'_>) -> Result<(), Box<dyn Error>> {
        self.wf = src.read_mat()?;
        self.wi = src.read_mat()?;
        self.wc = src.read_mat()?;
        self.wo = src.read_mat()?;
        self.bf = src.read_mat()?;
        self.bi = src.read_mat()?;
        self.bc = src.read_mat()?;
        self.bo = src.read_mat()?;
        Ok(())
    }

    fn reset_state(&mut self) {
        self.h.clear();
        self.c.clear();
        self.cache = None;
    }
}
