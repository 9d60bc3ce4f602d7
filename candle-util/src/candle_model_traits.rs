use candle_core::{Result, Tensor};

pub trait EncoderModuleT {
    /// An encoder that spits out two results (topic proportions, KL loss)
    ///
    /// # Arguments
    /// * `x_nd` - bag-of-words counts (n x d)
    /// * `train` - whether to sample and update batchnorm statistics
    ///
    /// # Returns `(theta_nk, kl_loss_n)`
    /// * `theta_nk` - topic proportions on the simplex (n x k)
    /// * `kl_loss_n` - KL divergence to the prior (n)
    fn forward_t(&self, x_nd: &Tensor, train: bool) -> Result<(Tensor, Tensor)>;

    fn dim_obs(&self) -> usize;

    fn dim_latent(&self) -> usize;
}

pub trait DecoderModuleT {
    /// A decoder that spits out unnormalized reconstruction logits (n x d)
    /// * `theta_nk` - topic proportions
    /// * `background_d` - log-frequency bias shared by all documents
    /// * `train` - whether to update batchnorm statistics
    fn forward_t(&self, theta_nk: &Tensor, background_d: &Tensor, train: bool) -> Result<Tensor>;

    /// Topic-word weight matrix (k x d)
    fn get_dictionary(&self) -> Result<Tensor>;

    fn dim_obs(&self) -> usize;

    fn dim_latent(&self) -> usize;
}

/// What a topic VAE hands back for one minibatch
pub struct TopicVaeOutput {
    /// topic proportions (n x k)
    pub theta_nk: Tensor,
    /// reconstruction logits over the vocabulary (n x d)
    pub logits_nd: Tensor,
    /// KL divergence of each document's posterior (n)
    pub kl_n: Tensor,
}

/// A variational autoencoder over bag-of-words documents, consumed by
/// the topic model as a black box
pub trait TopicVaeT {
    fn forward_t(&self, x_nd: &Tensor, background_d: &Tensor, train: bool)
        -> Result<TopicVaeOutput>;

    /// The current (k x d) topic-word weights
    fn get_beta(&self) -> Result<Tensor>;

    fn dim_obs(&self) -> usize;

    fn dim_latent(&self) -> usize;
}
