/// Element-wise activation applied after a dense layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ActFn {
    Relu,
    Sigmoid,
}

impl ActFn {
    #[inline]
    pub fn f(&self, z: f32) -> f32 {
        match self {
            ActFn::Relu => z.max(0.0),
            ActFn::Sigmoid => 1.0 / (1.0 + (-z).exp()),
        }
    }

    #[inline]
    pub fn df(&self, z: f32) -> f32 {
        match self {
            ActFn::Relu => {
                if z > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            ActFn::Sigmoid => {
                let s = self.f(z);
                s * (1.0 - s)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relu_clips_negatives() {
        assert_eq!(ActFn::Relu.f(-2.0), 0.0);
        assert_eq!(ActFn::Relu.f(3.0), 3.0);
        assert_eq!(ActFn::Relu.df(-1.0), 0.0);
        assert_eq!(ActFn::Relu.df(0.5), 1.0);
    }

    #[test]
    fn sigmoid_is_centered() {
        assert!((ActFn::Sigmoid.f(0.0) - 0.5).abs() < 1e-6);
        assert!((ActFn::Sigmoid.df(0.0) - 0.25).abs() < 1e-6);
    }
}
