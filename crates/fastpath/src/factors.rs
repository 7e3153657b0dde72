use bot_detect_identity::{IdentitySalt, Signature};

/// One matchable dimension of a request's identity. `weight()` is the
/// contribution each factor makes toward a partial/weak match score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Factor {
    Primary,
    Ip,
    Ua,
    Subnet,
    ClientSide,
    Plugin,
}

impl Factor {
    pub fn weight(self) -> f64 {
        match self {
            Factor::Primary => 100.0,
            Factor::Ip => 50.0,
            Factor::Ua => 50.0,
            Factor::Subnet => 30.0,
            Factor::ClientSide => 80.0,
            Factor::Plugin => 60.0,
        }
    }
}

/// Raw per-request material the caller has on hand. Client-side and
/// plugin factors are absent on first contact; they arrive later via a
/// post-response callback.
pub struct IdentityInputs<'a> {
    pub ip: &'a str,
    pub ua: &'a str,
    pub subnet: &'a str,
    pub client_side: Option<(&'a str, &'a str, &'a str)>,
    pub plugins: Option<(&'a str, &'a str)>,
}

/// The same material, reduced to salted hashes — what actually gets
/// stored and compared.
#[derive(Debug, Clone)]
pub struct FactorHashes {
    pub primary: Signature,
    pub ip: Signature,
    pub ua: Signature,
    pub subnet: Signature,
    pub client_side: Option<Signature>,
    pub plugin: Option<Signature>,
}

impl FactorHashes {
    pub fn compute(salt: &IdentitySalt, inputs: &IdentityInputs<'_>) -> Self {
        Self {
            primary: salt.hash(&[inputs.ip, inputs.ua]),
            ip: salt.hash(&[inputs.ip]),
            ua: salt.hash(&[inputs.ua]),
            subnet: salt.hash(&[inputs.subnet]),
            client_side: inputs.client_side.map(|(canvas, webgl, audio)| salt.hash(&[canvas, webgl, audio])),
            plugin: inputs.plugins.map(|(plugins, fonts)| salt.hash(&[plugins, fonts])),
        }
    }
}
