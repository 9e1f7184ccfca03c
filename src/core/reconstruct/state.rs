#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Init,
    Scanning,
    Validating,
    Correcting,
    Done,
}

impl Phase {
    pub fn name(&self) -> &'static str {
        match self {
            Phase::Init => "init",
            Phase::Scanning => "scanning",
            Phase::Validating => "validating",
            Phase::Correcting => "correcting",
            Phase::Done => "done",
        }
    }
}
