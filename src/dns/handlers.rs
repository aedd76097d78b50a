use crate::dns::responder::{Resolution, Responder};
use crate::error::Error;
use hickory_server::authority::MessageResponseBuilder;
use hickory_server::proto::op::{Edns, Header, MessageType, OpCode, ResponseCode};
use hickory_server::server::{Request, RequestHandler, ResponseHandler, ResponseInfo};
use tracing::error;

/// The only EDNS version spoken.
const EDNS_VERSION: u8 = 0;

/// The UDP payload size advertised in every OPT record we send.
const EDNS_MAX_PAYLOAD: u16 = 512;

#[derive(Clone)]
pub struct Handler {
    responder: Responder,
}

impl Handler {
    pub(super) fn new(responder: Responder) -> Self {
        Handler { responder }
    }

    async fn dispatch_request<R: ResponseHandler>(
        &self,
        request: &Request,
        response_handle: R,
    ) -> Result<ResponseInfo, Error> {
        let mut response_edns = None;
        if let Some(request_edns) = request.edns() {
            let mut edns = Edns::new();
            edns.set_max_payload(EDNS_MAX_PAYLOAD);
            edns.set_version(EDNS_VERSION);
            if request_edns.version() > EDNS_VERSION {
                tracing::debug!(
                    "unsupported EDNS version {} from {}",
                    request_edns.version(),
                    request.src()
                );
                return self.send_badvers(request, response_handle, edns).await;
            }
            response_edns = Some(edns);
        }

        // Only standard queries are answered.
        if request.op_code() != OpCode::Query || request.message_type() != MessageType::Query {
            return self
                .send_notimpl(request, response_handle, response_edns)
                .await;
        }

        let resolution = self
            .responder
            .resolve(std::slice::from_ref(request.query()))
            .await;
        self.send_resolution(request, response_handle, response_edns, resolution)
            .await
    }

    async fn send_badvers<R: ResponseHandler>(
        &self,
        request: &Request,
        mut response_handle: R,
        mut edns: Edns,
    ) -> Result<ResponseInfo, Error> {
        let mut header = Header::response_from_request(request.header());
        header.set_response_code(ResponseCode::BADVERS);
        edns.set_rcode_high(ResponseCode::BADVERS.high());
        let mut builder = MessageResponseBuilder::from_message_request(request);
        builder.edns(edns);
        Ok(response_handle
            .send_response(builder.build_no_records(header))
            .await?)
    }

    async fn send_notimpl<R: ResponseHandler>(
        &self,
        request: &Request,
        mut response_handle: R,
        edns: Option<Edns>,
    ) -> Result<ResponseInfo, Error> {
        let mut builder = MessageResponseBuilder::from_message_request(request);
        if let Some(edns) = edns {
            builder.edns(edns);
        }
        Ok(response_handle
            .send_response(builder.error_msg(request.header(), ResponseCode::NotImp))
            .await?)
    }

    async fn send_resolution<R: ResponseHandler>(
        &self,
        request: &Request,
        mut response_handle: R,
        edns: Option<Edns>,
        resolution: Resolution,
    ) -> Result<ResponseInfo, Error> {
        let mut header = Header::response_from_request(request.header());
        header.set_authoritative(resolution.authoritative);
        header.set_response_code(resolution.response_code);
        let mut builder = MessageResponseBuilder::from_message_request(request);
        if let Some(edns) = edns {
            builder.edns(edns);
        }
        let response = builder.build(
            header,
            resolution.answers.iter(),
            &[],
            resolution.soa.iter(),
            &[],
        );
        Ok(response_handle.send_response(response).await?)
    }
}

#[async_trait::async_trait]
impl RequestHandler for Handler {
    async fn handle_request<R: ResponseHandler>(
        &self,
        request: &Request,
        response_handle: R,
    ) -> ResponseInfo {
        match self.dispatch_request(request, response_handle).await {
            Ok(info) => info,
            Err(error) => {
                error!("error in RequestHandler: {:?}", error);
                let mut header = Header::new();
                header.set_response_code(ResponseCode::ServFail);
                header.into()
            }
        }
    }
}
